use serde::Serialize;

/// Boolean predicate tree accepted by every `*Find` endpoint.
///
/// ```
/// use hostingde_deploy::api::filter::{Filter, fields};
///
/// let filter = Filter::and(vec![
///     Filter::field(fields::WEBSPACE_NAME, "acme-main-web"),
///     Filter::field(fields::WEBSPACE_STATUS, "active"),
/// ]);
///
/// let json = serde_json::to_value(&filter).unwrap();
/// assert_eq!(json["subFilterConnective"], "AND");
/// assert_eq!(json["subFilter"][0]["field"], "webspaceName");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Filter {
    Field {
        field: String,
        value: String,
    },
    Group {
        #[serde(rename = "subFilterConnective")]
        connective: Connective,
        #[serde(rename = "subFilter")]
        filters: Vec<Filter>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    And,
    Or,
}

/// Field names understood by the find endpoints. Values may end in `*`
/// to match by prefix.
pub mod fields {
    pub const WEBSPACE_ID: &str = "webspaceId";
    pub const WEBSPACE_NAME: &str = "webspaceName";
    pub const WEBSPACE_STATUS: &str = "webspaceStatus";
    pub const VHOST_STATUS: &str = "vHostStatus";
    pub const USER_NAME: &str = "userName";
    pub const DATABASE_ID: &str = "databaseId";
    pub const DATABASE_NAME: &str = "databaseName";
    pub const DATABASE_STATUS: &str = "databaseStatus";
}

impl Filter {
    #[must_use]
    pub fn field(field: &str, value: &str) -> Self {
        Self::Field {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    #[must_use]
    pub const fn and(filters: Vec<Self>) -> Self {
        Self::Group {
            connective: Connective::And,
            filters,
        }
    }

    #[must_use]
    pub const fn or(filters: Vec<Self>) -> Self {
        Self::Group {
            connective: Connective::Or,
            filters,
        }
    }

    /// `field = value1 OR field = value2 ...`
    #[must_use]
    pub fn any_of(field: &str, values: &[String]) -> Self {
        Self::or(values.iter().map(|v| Self::field(field, v)).collect())
    }
}
