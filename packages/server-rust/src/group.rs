//! Handler groups: the unit of registration.
//!
//! A group is a named, frozen collection of endpoints sharing a default
//! queue. Construction performs no transport calls; the group is inert until
//! handed to the dispatch engine.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::error::GroupError;

/// Options applied to every endpoint in a group.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Default queue group; an endpoint's queue override takes precedence.
    pub queue: Option<String>,
}

/// Named, frozen collection of endpoints.
///
/// The endpoint list is stored behind `Arc<[Endpoint]>`: once constructed
/// there is no way to append, satisfying the freeze-after-construction
/// contract at the type level. Each instance carries a fresh identity so the
/// dispatch engine can reject double registration of the *same* instance
/// while still allowing two instances to share a group name.
#[derive(Debug, Clone)]
pub struct HandlerGroup {
    name: String,
    default_queue: Option<String>,
    endpoints: Arc<[Endpoint]>,
    identity: Uuid,
}

impl HandlerGroup {
    /// Builds and freezes a group.
    ///
    /// An empty group name is permitted; the transport subject for each
    /// endpoint is `{group}.{endpoint}` regardless.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::DuplicateEndpoint`] if two endpoints share a
    /// name. Silently keeping both (or letting the later one win) would make
    /// subject binding transport-dependent, so duplicates are rejected
    /// outright.
    pub fn new(
        name: impl Into<String>,
        endpoints: Vec<Endpoint>,
        options: GroupOptions,
    ) -> Result<Self, GroupError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.name().to_string()) {
                return Err(GroupError::DuplicateEndpoint {
                    group: name,
                    name: endpoint.name().to_string(),
                });
            }
        }
        Ok(Self {
            name,
            default_queue: options.queue,
            endpoints: endpoints.into(),
            identity: Uuid::new_v4(),
        })
    }

    /// The group name; segments the transport subject namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default queue applied to endpoints without an override.
    #[must_use]
    pub const fn default_queue(&self) -> Option<&String> {
        self.default_queue.as_ref()
    }

    /// The frozen endpoint list, in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// This instance's registration identity.
    #[must_use]
    pub const fn identity(&self) -> Uuid {
        self.identity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::endpoint::handler_fn;

    fn endpoint(name: &str) -> Endpoint {
        Endpoint::new(name, handler_fn(|_p, _h| async { Ok(Value::Null) }))
    }

    #[test]
    fn construction_freezes_endpoints_in_order() {
        let group = HandlerGroup::new(
            "math",
            vec![endpoint("add"), endpoint("sub")],
            GroupOptions::default(),
        )
        .unwrap();
        let names: Vec<&str> = group.endpoints().iter().map(Endpoint::name).collect();
        assert_eq!(names, vec!["add", "sub"]);
        assert!(group.default_queue().is_none());
    }

    #[test]
    fn duplicate_endpoint_names_are_rejected() {
        let err = HandlerGroup::new(
            "math",
            vec![endpoint("add"), endpoint("add")],
            GroupOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GroupError::DuplicateEndpoint { ref group, ref name }
                if group == "math" && name == "add"
        ));
    }

    #[test]
    fn empty_group_and_endpoint_names_are_permitted() {
        let group =
            HandlerGroup::new("", vec![endpoint("")], GroupOptions::default()).unwrap();
        assert_eq!(group.name(), "");
        assert_eq!(group.endpoints()[0].name(), "");
    }

    #[test]
    fn group_options_set_the_default_queue() {
        let group = HandlerGroup::new(
            "math",
            vec![endpoint("add")],
            GroupOptions {
                queue: Some("math-workers".to_string()),
            },
        )
        .unwrap();
        assert_eq!(
            group.default_queue().map(String::as_str),
            Some("math-workers")
        );
    }

    #[test]
    fn each_instance_has_a_distinct_identity() {
        let a = HandlerGroup::new("math", vec![endpoint("add")], GroupOptions::default())
            .unwrap();
        let b = HandlerGroup::new("math", vec![endpoint("add")], GroupOptions::default())
            .unwrap();
        assert_ne!(a.identity(), b.identity());
        // Cloning preserves identity: a clone is the same logical instance.
        assert_eq!(a.identity(), a.clone().identity());
    }
}
