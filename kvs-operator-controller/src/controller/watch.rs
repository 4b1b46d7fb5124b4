// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Turns the raw watch stream into change notifications and decides which of them need a
//! reconcile.

use kube::runtime::watcher;
use kube::{Resource, ResourceExt};
use std::collections::{HashMap, HashSet};

use kvs_operator_common::telemetry::warn;

use crate::controller::object_key::ObjectKey;

/// A change to a specification, keyed by identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecEvent {
    Added {
        key: ObjectKey,
        version: String,
    },
    Updated {
        key: ObjectKey,
        old_version: String,
        new_version: String,
    },
    Deleted {
        key: ObjectKey,
    },
}

impl SpecEvent {
    pub fn key(&self) -> &ObjectKey {
        match self {
            SpecEvent::Added { key, .. } | SpecEvent::Updated { key, .. } | SpecEvent::Deleted { key } => key,
        }
    }
}

/// Tracks the last seen resource version of every object to classify watch events
#[derive(Debug, Default)]
pub struct SpecEventAdapter {
    versions: HashMap<ObjectKey, String>,
    relist: Option<Vec<(ObjectKey, String)>>,
}

impl SpecEventAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one watch event
    ///
    /// Objects from a relist are held back until the relist completes, when the reflector
    /// store swaps them in. Objects seen before the relist but missing from it are then
    /// reported as deleted.
    pub fn handle<K>(&mut self, event: &watcher::Event<K>) -> Vec<SpecEvent>
    where
        K: Resource,
    {
        match event {
            watcher::Event::Init => {
                self.relist = Some(Vec::new());
                Vec::new()
            }
            watcher::Event::InitApply(object) => {
                let Some(key) = Self::key_of(object) else {
                    return Vec::new();
                };
                match self.relist.as_mut() {
                    Some(listed) => {
                        listed.push((key, object.resource_version().unwrap_or_default()));
                        Vec::new()
                    }
                    None => vec![self.observe(key, object.resource_version().unwrap_or_default())],
                }
            }
            watcher::Event::InitDone => {
                let listed = self.relist.take().unwrap_or_default();
                let seen = listed.iter().map(|(key, _)| key.clone()).collect::<HashSet<_>>();
                let gone = self.versions
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect::<Vec<_>>();

                let mut events = listed
                    .into_iter()
                    .map(|(key, version)| self.observe(key, version))
                    .collect::<Vec<_>>();
                events.extend(gone.into_iter().map(|key| {
                    self.versions.remove(&key);
                    SpecEvent::Deleted { key }
                }));
                events
            }
            watcher::Event::Apply(object) => match Self::key_of(object) {
                Some(key) => vec![self.observe(key, object.resource_version().unwrap_or_default())],
                None => Vec::new(),
            },
            watcher::Event::Delete(object) => match Self::key_of(object) {
                Some(key) => {
                    self.versions.remove(&key);
                    vec![SpecEvent::Deleted { key }]
                }
                None => Vec::new(),
            },
        }
    }

    fn observe(&mut self, key: ObjectKey, version: String) -> SpecEvent {
        match self.versions.insert(key.clone(), version.clone()) {
            None => SpecEvent::Added { key, version },
            Some(old_version) => SpecEvent::Updated {
                key,
                old_version,
                new_version: version,
            },
        }
    }

    fn key_of<K: Resource>(object: &K) -> Option<ObjectKey> {
        let key = ObjectKey::from_resource(object);
        if key.is_none() {
            warn!(
                event = "IgnoringObject",
                name = object.name_any().as_str(),
                reason = "object has no namespace",
            );
        }
        key
    }
}

/// The identity to enqueue for an event, if any
///
/// Additions and deletions always pass. Updates pass only when the resource version moved,
/// which filters out the periodic resync of unchanged objects.
pub fn admit(event: &SpecEvent) -> Option<ObjectKey> {
    match event {
        SpecEvent::Added { key, .. } | SpecEvent::Deleted { key } => Some(key.clone()),
        SpecEvent::Updated { key, old_version, new_version } => {
            (old_version != new_version).then(|| key.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::keyvault_secret;
    use crate::crd::KeyvaultSecret;

    fn object(name: &str, version: &str) -> KeyvaultSecret {
        let mut resource = keyvault_secret("team-a", name, "", vec![]);
        resource.metadata.resource_version = Some(version.to_string());
        resource
    }

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("team-a", name)
    }

    #[test]
    fn first_sight_is_an_addition() {
        let mut adapter = SpecEventAdapter::new();

        assert_eq!(
            adapter.handle(&watcher::Event::Apply(object("db", "1"))),
            vec![SpecEvent::Added { key: key("db"), version: "1".to_string() }]
        );
    }

    #[test]
    fn later_sight_is_an_update() {
        let mut adapter = SpecEventAdapter::new();
        adapter.handle(&watcher::Event::Apply(object("db", "1")));

        assert_eq!(
            adapter.handle(&watcher::Event::Apply(object("db", "2"))),
            vec![SpecEvent::Updated {
                key: key("db"),
                old_version: "1".to_string(),
                new_version: "2".to_string(),
            }]
        );
    }

    #[test]
    fn delete_forgets_the_object() {
        let mut adapter = SpecEventAdapter::new();
        adapter.handle(&watcher::Event::Apply(object("db", "1")));

        assert_eq!(
            adapter.handle(&watcher::Event::Delete(object("db", "1"))),
            vec![SpecEvent::Deleted { key: key("db") }]
        );
        assert!(matches!(
            adapter.handle(&watcher::Event::Apply(object("db", "3")))[..],
            [SpecEvent::Added { .. }]
        ));
    }

    #[test]
    fn relist_reports_vanished_objects() {
        let mut adapter = SpecEventAdapter::new();
        adapter.handle(&watcher::Event::Apply(object("db", "1")));
        adapter.handle(&watcher::Event::Apply(object("cache", "1")));

        assert!(adapter.handle::<KeyvaultSecret>(&watcher::Event::Init).is_empty());
        assert!(adapter.handle(&watcher::Event::InitApply(object("db", "1"))).is_empty());
        assert_eq!(
            adapter.handle::<KeyvaultSecret>(&watcher::Event::InitDone),
            vec![
                SpecEvent::Updated {
                    key: key("db"),
                    old_version: "1".to_string(),
                    new_version: "1".to_string(),
                },
                SpecEvent::Deleted { key: key("cache") },
            ]
        );
    }

    #[test]
    fn initial_list_is_held_until_done() {
        let mut adapter = SpecEventAdapter::new();
        adapter.handle::<KeyvaultSecret>(&watcher::Event::Init);

        assert!(adapter.handle(&watcher::Event::InitApply(object("db", "7"))).is_empty());
        assert!(adapter.handle(&watcher::Event::InitApply(object("cache", "3"))).is_empty());

        assert_eq!(adapter.handle::<KeyvaultSecret>(&watcher::Event::InitDone), vec![
            SpecEvent::Added { key: key("db"), version: "7".to_string() },
            SpecEvent::Added { key: key("cache"), version: "3".to_string() },
        ]);
        assert!(adapter.handle::<KeyvaultSecret>(&watcher::Event::InitDone).is_empty());
    }

    #[test]
    fn changes_during_relist_are_reported_at_done() {
        let mut adapter = SpecEventAdapter::new();
        adapter.handle(&watcher::Event::Apply(object("db", "1")));
        adapter.handle::<KeyvaultSecret>(&watcher::Event::Init);
        adapter.handle(&watcher::Event::InitApply(object("db", "4")));

        let events = adapter.handle::<KeyvaultSecret>(&watcher::Event::InitDone);

        assert_eq!(events.iter().filter_map(admit).collect::<Vec<_>>(), vec![key("db")]);
    }

    #[test]
    fn cluster_scoped_objects_are_ignored() {
        let mut adapter = SpecEventAdapter::new();
        let mut resource = object("db", "1");
        resource.metadata.namespace = None;

        assert!(adapter.handle(&watcher::Event::Apply(resource)).is_empty());
    }

    #[test]
    fn admission_policy() {
        assert_eq!(
            admit(&SpecEvent::Added { key: key("db"), version: "1".to_string() }),
            Some(key("db"))
        );
        assert_eq!(admit(&SpecEvent::Deleted { key: key("db") }), Some(key("db")));
        assert_eq!(
            admit(&SpecEvent::Updated {
                key: key("db"),
                old_version: "1".to_string(),
                new_version: "2".to_string(),
            }),
            Some(key("db"))
        );
        assert_eq!(
            admit(&SpecEvent::Updated {
                key: key("db"),
                old_version: "2".to_string(),
                new_version: "2".to_string(),
            }),
            None
        );
    }
}
