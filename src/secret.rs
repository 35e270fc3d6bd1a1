use rand::Rng;
use uuid::Uuid;

/// Random password for users created by this crate.
#[must_use]
pub fn generate_password() -> String {
    Uuid::new_v4().to_string()
}

/// Name for a short-lived database user, `gh` and seven digits.
#[must_use]
pub fn temporary_user_name() -> String {
    format!("gh{}", rand::thread_rng().gen_range(1_000_000..10_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_unique() {
        assert_ne!(generate_password(), generate_password());
    }

    #[test]
    fn temporary_name_shape() {
        let name = temporary_user_name();

        assert_eq!(name.len(), 9);
        assert!(name.starts_with("gh"));
        assert!(name[2..].chars().all(|c| c.is_ascii_digit()));
    }
}
