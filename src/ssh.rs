use crate::cmd;
use crate::error::HostingResult;

/// Port the webspace SSH daemons listen on.
pub const SSH_PORT: u16 = 2244;

/// SSH session to a webspace host.
pub struct SshSession {
    host: String,
    remote_forward: Option<String>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            remote_forward: None,
        }
    }

    /// Forward `localhost:{listen_port}` on the remote side to
    /// `target_host:target_port` as seen from here (`ssh -R`).
    #[must_use]
    pub fn remote_forward(mut self, listen_port: u16, target_host: &str, target_port: u16) -> Self {
        self.remote_forward = Some(format!("localhost:{listen_port}:{target_host}:{target_port}"));
        self
    }

    /// Execute a command on the remote host with inherited stdio.
    pub fn exec_interactive(&self, command: &str) -> HostingResult<()> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("ssh", &refs)
    }

    pub(crate) fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-p".to_string(),
            SSH_PORT.to_string(),
        ];
        if let Some(forward) = &self.remote_forward {
            args.push("-R".to_string());
            args.push(forward.clone());
        }
        args.push(self.host.clone());
        args.push(command.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tunnel_args_precede_destination() {
        let session = SshSession::new("from.example.test").remote_forward(50000, "to.example.test", SSH_PORT);

        assert_eq!(
            session.build_ssh_args("true"),
            vec![
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-p",
                "2244",
                "-R",
                "localhost:50000:to.example.test:2244",
                "from.example.test",
                "true",
            ]
        );
    }
}
