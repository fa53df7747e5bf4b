//! crates/observer/src/processor.rs
//! Turns incoming wire messages into mirror updates and replies.

use std::collections::BTreeMap;

use logging::{LogRecord, clock};
use protocol::{Routing, WireBody, WireMessage};

use crate::mirror::InstanceMirror;

/// Result of processing one message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ObserverOutcome {
    /// An instance announced its scope table.
    Registered {
        /// Announcing instance.
        instance: u32,
        /// Scopes in the table.
        scopes: usize,
    },
    /// An instance re-announced its table after a change.
    ScopesChanged {
        /// Announcing instance.
        instance: u32,
    },
    /// A request to an instance was applied to its mirror and should be
    /// delivered to the instance.
    Forward {
        /// Message to deliver unchanged.
        message: WireMessage,
        /// Mirrored scopes the request changed.
        changed: usize,
    },
    /// Messages to send back to the requester.
    Reply(Vec<WireMessage>),
    /// An instance acknowledged a save request.
    ConfigurationSaved {
        /// Acknowledging instance.
        instance: u32,
    },
    /// A decoded record, stamped with its reception time.
    Record(Box<LogRecord>),
    /// A request named an instance the observer has not seen.
    UnknownInstance(u32),
}

/// Observer-side state machine for the wire protocol.
///
/// Keeps one [`InstanceMirror`] per instance id seen in a routing header and
/// answers queries from those mirrors, so they never reach the instances.
///
/// # Examples
///
/// ```
/// use logging::{Priority, ScopeId, ScopeSnapshot};
/// use observer::{ObserverMessageProcessor, ObserverOutcome};
/// use protocol::{Routing, WireBody, WireMessage};
///
/// let mut observer = ObserverMessageProcessor::new(1);
/// let announce = WireMessage::new(
///     Routing::new(1, 7, 0),
///     WireBody::RegisterScopes(vec![ScopeSnapshot {
///         id: ScopeId::of("net_tcp"),
///         name: "net_tcp".into(),
///         priority: Priority::INFO,
///     }]),
/// );
/// assert_eq!(
///     observer.process(&announce),
///     ObserverOutcome::Registered { instance: 7, scopes: 1 },
/// );
/// assert_eq!(observer.instance(7).map(|m| m.scopes.len()), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct ObserverMessageProcessor {
    local_id: u32,
    instances: BTreeMap<u32, InstanceMirror>,
}

impl ObserverMessageProcessor {
    /// Creates an observer identified as `local_id` in routing headers.
    #[must_use]
    pub fn new(local_id: u32) -> Self {
        Self {
            local_id,
            instances: BTreeMap::new(),
        }
    }

    /// Id of this observer.
    #[must_use]
    pub const fn local_id(&self) -> u32 {
        self.local_id
    }

    /// Mirror of instance `id`.
    #[must_use]
    pub fn instance(&self, id: u32) -> Option<&InstanceMirror> {
        self.instances.get(&id)
    }

    /// All mirrors, ordered by instance id.
    pub fn instances(&self) -> impl Iterator<Item = &InstanceMirror> {
        self.instances.values()
    }

    /// Forgets instance `id`, typically after its connection closed.
    pub fn disconnect(&mut self, id: u32) -> Option<InstanceMirror> {
        let removed = self.instances.remove(&id);
        if removed.is_some() {
            tracing::debug!(instance = id, "instance disconnected");
        }
        removed
    }

    /// Processes one message.
    pub fn process(&mut self, message: &WireMessage) -> ObserverOutcome {
        let routing = message.routing;
        match &message.body {
            WireBody::RegisterScopes(scopes) => {
                let mirror = self.mirror_mut(routing.source);
                mirror.replace_scopes(scopes.clone());
                tracing::debug!(instance = routing.source, scopes = scopes.len(), "scopes registered");
                ObserverOutcome::Registered {
                    instance: routing.source,
                    scopes: scopes.len(),
                }
            }
            WireBody::ScopesUpdated(scopes) => {
                self.mirror_mut(routing.source).replace_scopes(scopes.clone());
                ObserverOutcome::ScopesChanged {
                    instance: routing.source,
                }
            }
            WireBody::UpdateScopes(updates) => {
                let Some(mirror) = self.instances.get_mut(&routing.target) else {
                    return ObserverOutcome::UnknownInstance(routing.target);
                };
                let changed = updates.iter().map(|update| mirror.apply_update(update)).sum();
                ObserverOutcome::Forward {
                    message: message.clone(),
                    changed,
                }
            }
            WireBody::SaveConfiguration => {
                let Some(mirror) = self.instances.get_mut(&routing.target) else {
                    return ObserverOutcome::UnknownInstance(routing.target);
                };
                mirror.configuration_saved = false;
                ObserverOutcome::Forward {
                    message: message.clone(),
                    changed: 0,
                }
            }
            WireBody::ConfigurationSaved => {
                self.mirror_mut(routing.source).configuration_saved = true;
                ObserverOutcome::ConfigurationSaved {
                    instance: routing.source,
                }
            }
            WireBody::QueryScopes { target } => match self.instances.get(target) {
                Some(mirror) => ObserverOutcome::Reply(vec![WireMessage::new(
                    Routing::new(routing.source, mirror.id, routing.sequence),
                    WireBody::ScopesUpdated(mirror.scopes.clone()),
                )]),
                None => ObserverOutcome::UnknownInstance(*target),
            },
            WireBody::QueryInstances { target } => self.answer_instances(routing, *target),
            WireBody::LogMessage(record) => {
                let mut record = record.clone();
                record.received_timestamp = clock::monotonic_nanos();
                let mirror = self.mirror_mut(routing.source);
                if mirror.cookie != record.connection_cookie {
                    tracing::debug!(
                        instance = routing.source,
                        cookie = record.connection_cookie,
                        "instance connection changed"
                    );
                    mirror.cookie = record.connection_cookie;
                }
                mirror.records += 1;
                ObserverOutcome::Record(record)
            }
        }
    }

    /// Answers with one `RegisterScopes` per matching instance; target `0`
    /// asks for every instance.
    fn answer_instances(&self, routing: Routing, target: u32) -> ObserverOutcome {
        if target != 0 && !self.instances.contains_key(&target) {
            return ObserverOutcome::UnknownInstance(target);
        }
        let replies = self
            .instances
            .values()
            .filter(|mirror| target == 0 || mirror.id == target)
            .map(|mirror| {
                WireMessage::new(
                    Routing::new(routing.source, mirror.id, routing.sequence),
                    WireBody::RegisterScopes(mirror.scopes.clone()),
                )
            })
            .collect();
        ObserverOutcome::Reply(replies)
    }

    fn mirror_mut(&mut self, id: u32) -> &mut InstanceMirror {
        self.instances.entry(id).or_insert_with(|| {
            tracing::debug!(instance = id, "new instance");
            InstanceMirror::new(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::{DataOrigin, Priority, ScopeId, ScopeSnapshot, ScopeUpdate, Severity};

    const UI: u32 = 99;

    fn snapshot(name: &str, priority: Priority) -> ScopeSnapshot {
        ScopeSnapshot {
            id: ScopeId::of(name),
            name: name.to_owned(),
            priority,
        }
    }

    fn registered(instance: u32) -> ObserverMessageProcessor {
        let mut observer = ObserverMessageProcessor::new(1);
        observer.process(&WireMessage::new(
            Routing::new(1, instance, 0),
            WireBody::RegisterScopes(vec![
                snapshot("net_tcp", Priority::DEBUG),
                snapshot("net_udp", Priority::DEBUG),
                snapshot("app_core", Priority::DEBUG),
            ]),
        ));
        observer
    }

    #[test]
    fn group_update_is_mirrored_and_forwarded() {
        let mut observer = registered(5);
        let request = WireMessage::new(
            Routing::new(5, UI, 3),
            WireBody::UpdateScopes(vec![ScopeUpdate::named("net_*", Priority::ERROR)]),
        );
        assert_eq!(
            observer.process(&request),
            ObserverOutcome::Forward {
                message: request.clone(),
                changed: 2,
            }
        );
        let mirror = observer.instance(5).expect("mirror");
        assert_eq!(mirror.priority_of("net_udp"), Some(Priority::ERROR));
        assert_eq!(mirror.priority_of("app_core"), Some(Priority::DEBUG));
    }

    #[test]
    fn query_scopes_is_answered_from_the_mirror() {
        let mut observer = registered(5);
        let outcome = observer.process(&WireMessage::new(
            Routing::new(1, UI, 8),
            WireBody::QueryScopes { target: 5 },
        ));
        let ObserverOutcome::Reply(replies) = outcome else {
            panic!("expected reply");
        };
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].routing, Routing::new(UI, 5, 8));
        let WireBody::ScopesUpdated(scopes) = &replies[0].body else {
            panic!("expected scopes updated");
        };
        assert_eq!(scopes[0].name, "app_core");
    }

    #[test]
    fn query_instances_lists_every_instance() {
        let mut observer = registered(5);
        observer.process(&WireMessage::new(
            Routing::new(1, 6, 0),
            WireBody::RegisterScopes(Vec::new()),
        ));
        let all = observer.process(&WireMessage::new(
            Routing::new(1, UI, 0),
            WireBody::QueryInstances { target: 0 },
        ));
        let ObserverOutcome::Reply(replies) = all else {
            panic!("expected reply");
        };
        let sources: Vec<_> = replies.iter().map(|m| m.routing.source).collect();
        assert_eq!(sources, [5, 6]);
        assert!(replies.iter().all(|m| m.kind() == protocol::WireKind::RegisterScopes));
    }

    #[test]
    fn unknown_instances_are_reported() {
        let mut observer = registered(5);
        for body in [
            WireBody::QueryScopes { target: 42 },
            WireBody::QueryInstances { target: 42 },
        ] {
            assert_eq!(
                observer.process(&WireMessage::new(Routing::new(1, UI, 0), body)),
                ObserverOutcome::UnknownInstance(42)
            );
        }
        assert_eq!(
            observer.process(&WireMessage::new(Routing::new(42, UI, 0), WireBody::SaveConfiguration)),
            ObserverOutcome::UnknownInstance(42)
        );
    }

    #[test]
    fn save_round_trip_tracks_acknowledgement() {
        let mut observer = registered(5);
        observer.process(&WireMessage::new(Routing::new(5, UI, 0), WireBody::SaveConfiguration));
        assert!(!observer.instance(5).expect("mirror").configuration_saved);
        assert_eq!(
            observer.process(&WireMessage::new(Routing::new(1, 5, 0), WireBody::ConfigurationSaved)),
            ObserverOutcome::ConfigurationSaved { instance: 5 }
        );
        assert!(observer.instance(5).expect("mirror").configuration_saved);
    }

    #[test]
    fn records_are_stamped_on_reception() {
        let mut observer = registered(5);
        let mut record = LogRecord::text(ScopeId::of("net_tcp"), Severity::Info, "up");
        record.data_origin = DataOrigin::Remote;
        record.connection_cookie = 77;
        let outcome = observer.process(&WireMessage::new(
            Routing::new(1, 5, 0),
            WireBody::LogMessage(Box::new(record.clone())),
        ));
        let ObserverOutcome::Record(received) = outcome else {
            panic!("expected record");
        };
        assert!(received.received_timestamp >= record.timestamp);
        assert_eq!(received.message.as_str(), "up");

        let mirror = observer.instance(5).expect("mirror");
        assert_eq!(mirror.cookie, 77);
        assert_eq!(mirror.records, 1);
    }

    #[test]
    fn disconnect_forgets_the_instance() {
        let mut observer = registered(5);
        assert!(observer.disconnect(5).is_some());
        assert!(observer.instance(5).is_none());
        assert!(observer.disconnect(5).is_none());
    }
}
