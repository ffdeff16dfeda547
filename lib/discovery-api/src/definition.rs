use serde::{Deserialize, Serialize};

/// ServiceDefinition as stored under the definitions base path.
///
/// The node key is the service key; the node value is this record in JSON.
/// `container_port` is kept wide on purpose so out-of-range values can be
/// rejected with a useful message instead of a generic decode error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Regular expression matched against container names
    #[serde(rename = "NamePattern", alias = "namePattern", alias = "name_pattern")]
    pub name_pattern: String,

    /// Port the service listens on inside the container
    #[serde(rename = "ContainerPort", alias = "containerPort", alias = "container_port")]
    pub container_port: i64,
}

impl ServiceDefinition {
    pub fn new(name_pattern: impl Into<String>, container_port: u16) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            container_port: i64::from(container_port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_go_style_fields() {
        let def: ServiceDefinition =
            serde_json::from_str(r#"{"NamePattern":"^app-.*","ContainerPort":8080}"#).unwrap();
        assert_eq!(def, ServiceDefinition::new("^app-.*", 8080));
    }

    #[test]
    fn test_decodes_camel_case_fields() {
        let def: ServiceDefinition =
            serde_json::from_str(r#"{"namePattern":"web","containerPort":80}"#).unwrap();
        assert_eq!(def.name_pattern, "web");
        assert_eq!(def.container_port, 80);
    }

    #[test]
    fn test_missing_port_is_rejected() {
        let res: Result<ServiceDefinition, _> = serde_json::from_str(r#"{"NamePattern":"web"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_encodes_go_style_fields() {
        let json = serde_json::to_string(&ServiceDefinition::new("db", 5432)).unwrap();
        assert_eq!(json, r#"{"NamePattern":"db","ContainerPort":5432}"#);
    }
}
