//! Audit trail vocabulary
//!
//! A history row points at the object it is about through [`LinkedObject`],
//! persisted as an `(object_type, object_id)` pair.

use super::DomainError;

/// Where a request came from, as recorded on connection events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket address.
    pub fn from_parts(
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        remote: Option<std::net::IpAddr>,
        user_agent: Option<&str>,
    ) -> Self {
        let non_empty = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        let ip_address = forwarded_for
            .and_then(|xff| xff.split(',').next())
            .and_then(non_empty)
            .or_else(|| real_ip.and_then(non_empty))
            .or_else(|| remote.map(|ip| ip.to_string()));

        Self {
            ip_address,
            user_agent: user_agent.and_then(non_empty),
        }
    }
}

string_enum! {
    pub enum HistoryAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Login => "login",
        Logout => "logout",
        Reservation => "reservation",
        Payment => "payment",
        Cancellation => "cancellation",
        Validation => "validation",
        Rejection => "rejection",
        Message => "message",
        Review => "review",
        Upload => "upload",
        Export => "export",
        Search => "search",
        Other => "other",
    }
}

string_enum! {
    pub enum Importance {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
        Security => "security",
    }
}

string_enum! {
    pub enum ObjectKind {
        User => "user",
        Reservation => "reservation",
        Review => "review",
        Invoice => "invoice",
        Payment => "payment",
        Message => "message",
        Service => "service",
    }
}

/// The object an audit row refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedObject {
    User(String),
    Reservation(String),
    Review(String),
    Invoice(String),
    Payment(String),
    Message(String),
    Service(String),
}

impl LinkedObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            LinkedObject::User(_) => ObjectKind::User,
            LinkedObject::Reservation(_) => ObjectKind::Reservation,
            LinkedObject::Review(_) => ObjectKind::Review,
            LinkedObject::Invoice(_) => ObjectKind::Invoice,
            LinkedObject::Payment(_) => ObjectKind::Payment,
            LinkedObject::Message(_) => ObjectKind::Message,
            LinkedObject::Service(_) => ObjectKind::Service,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            LinkedObject::User(id)
            | LinkedObject::Reservation(id)
            | LinkedObject::Review(id)
            | LinkedObject::Invoice(id)
            | LinkedObject::Payment(id)
            | LinkedObject::Message(id)
            | LinkedObject::Service(id) => id,
        }
    }

    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            ObjectKind::User => LinkedObject::User(id),
            ObjectKind::Reservation => LinkedObject::Reservation(id),
            ObjectKind::Review => LinkedObject::Review(id),
            ObjectKind::Invoice => LinkedObject::Invoice(id),
            ObjectKind::Payment => LinkedObject::Payment(id),
            ObjectKind::Message => LinkedObject::Message(id),
            ObjectKind::Service => LinkedObject::Service(id),
        }
    }

    /// Rebuild from the stored columns; both must be present or both absent.
    pub fn from_parts(
        object_type: Option<&str>,
        object_id: Option<&str>,
    ) -> Result<Option<Self>, DomainError> {
        match (object_type, object_id) {
            (Some(kind), Some(id)) => Ok(Some(Self::new(kind.parse()?, id))),
            (None, None) => Ok(None),
            _ => Err(DomainError::invalid(
                "object_type and object_id must be given together",
            )),
        }
    }
}

/// Split a comma separated tag column, dropping blanks.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_object_parts() {
        let obj = LinkedObject::Invoice("abc".into());
        assert_eq!(obj.kind(), ObjectKind::Invoice);
        assert_eq!(obj.id(), "abc");

        let rebuilt = LinkedObject::from_parts(Some("invoice"), Some("abc")).unwrap();
        assert_eq!(rebuilt, Some(obj));
        assert_eq!(LinkedObject::from_parts(None, None).unwrap(), None);
    }

    #[test]
    fn unknown_or_partial_objects_are_rejected() {
        assert!(LinkedObject::from_parts(Some("widget"), Some("1")).is_err());
        assert!(LinkedObject::from_parts(Some("user"), None).is_err());
    }

    #[test]
    fn tags() {
        assert_eq!(parse_tags("a, b,,c "), vec!["a", "b", "c"]);
        assert_eq!(join_tags(&["reservation", " status ", ""]), "reservation,status");
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn client_ip_prefers_the_first_forwarded_hop() {
        let remote = Some("10.0.0.9".parse().unwrap());
        let info = ClientInfo::from_parts(
            Some("203.0.113.7, 10.0.0.1"),
            Some("198.51.100.2"),
            remote,
            Some("curl/8.0"),
        );
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));

        let info = ClientInfo::from_parts(None, Some("198.51.100.2"), remote, None);
        assert_eq!(info.ip_address.as_deref(), Some("198.51.100.2"));
        assert_eq!(info.user_agent, None);

        let info = ClientInfo::from_parts(None, None, remote, Some("  "));
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(info.user_agent, None);

        assert_eq!(ClientInfo::from_parts(None, None, None, None), ClientInfo::default());
    }
}
