/// Structural problems in the input that make a hierarchical layout impossible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("cluster `{cluster}` is part of a parent cycle")]
    CyclicHierarchy { cluster: String },

    #[error("cluster `{cluster}` declares more than one parent: {}", parents.join(", "))]
    MultipleParents { cluster: String, parents: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cluster() {
        let err = LayoutError::MultipleParents {
            cluster: "db".to_string(),
            parents: vec!["vpc".to_string(), "dmz".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cluster `db` declares more than one parent: vpc, dmz"
        );
        let err = LayoutError::CyclicHierarchy { cluster: "a".to_string() };
        assert!(err.to_string().contains("`a`"));
    }
}
