//! Topic alias bookkeeping (MQTT 5 §3.3.2.3.4). Two independent
//! tables: one for aliases this client assigns on outbound PUBLISH
//! (`TxAliasTable`), one for aliases the broker assigns on inbound
//! PUBLISH (`RxAliasTable`). Aliases are per-connection state — both
//! tables are cleared on reconnect.

use std::collections::HashMap;

use crate::error::MqttError;

/// Aliases this client has handed out to the broker, topic -> alias id.
/// `usage_count` per alias tracks how many PUBLISHes have referenced it
/// since it was assigned, purely for diagnostics — it plays no role in
/// the protocol state machine.
pub struct TxAliasTable {
    max: u16,
    topic_to_alias: HashMap<String, u16>,
    usage_count: HashMap<u16, u64>,
    next_free: u16,
}

impl TxAliasTable {
    pub fn new(max: u16) -> Self {
        Self {
            max,
            topic_to_alias: HashMap::new(),
            usage_count: HashMap::new(),
            next_free: 1,
        }
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    pub fn set_max(&mut self, max: u16) {
        self.max = max;
    }

    /// Looks up an already-assigned alias for `topic`, bumping its
    /// usage counter.
    pub fn lookup(&mut self, topic: &str) -> Option<u16> {
        let alias = *self.topic_to_alias.get(topic)?;
        *self.usage_count.entry(alias).or_insert(0) += 1;
        Some(alias)
    }

    /// Peeks at `topic`'s alias without touching its usage counter, for
    /// callers that only want to know whether one already exists.
    pub fn alias_of(&self, topic: &str) -> Option<u16> {
        self.topic_to_alias.get(topic).copied()
    }

    /// Looks up an already-assigned alias the way a PUBLISH send needs
    /// to: returns the alias and whether this is its first use. An
    /// alias can exist with zero uses when it was pinned ahead of time
    /// via `assign_topic_alias` — the first PUBLISH after that must
    /// still carry the full topic name, since the broker has no
    /// binding for the alias yet.
    pub fn lookup_for_publish(&mut self, topic: &str) -> Option<(u16, bool)> {
        let alias = *self.topic_to_alias.get(topic)?;
        let count = self.usage_count.entry(alias).or_insert(0);
        let first_use = *count == 0;
        *count += 1;
        Some((alias, first_use))
    }

    /// Assigns a brand-new alias to `topic`, the caller having already
    /// confirmed (via `lookup`) that none exists yet. Returns the
    /// assigned id, or `AliasSpaceExhausted` once `max` aliases are in
    /// use — the caller then falls back to sending the topic name in
    /// full, per spec.md.
    pub fn assign(&mut self, topic: &str) -> Result<u16, MqttError> {
        if self.max == 0 || self.topic_to_alias.len() as u16 >= self.max {
            return Err(MqttError::AliasSpaceExhausted);
        }
        let alias = self.next_free;
        self.next_free += 1;
        self.topic_to_alias.insert(topic.to_string(), alias);
        self.usage_count.insert(alias, 0);
        Ok(alias)
    }

    pub fn reset(&mut self) {
        self.topic_to_alias.clear();
        self.usage_count.clear();
        self.next_free = 1;
    }
}

/// Aliases the broker has assigned on inbound PUBLISH, alias id ->
/// topic. A PUBLISH carrying an alias with no topic name refers back
/// to whatever topic was bound to that id; one carrying both an alias
/// and a topic name binds the alias for the first time. Rebinding an
/// alias that is already bound is a protocol error this client does
/// not support.
pub struct RxAliasTable {
    alias_to_topic: HashMap<u16, String>,
}

impl RxAliasTable {
    pub fn new() -> Self {
        Self {
            alias_to_topic: HashMap::new(),
        }
    }

    /// Resolves an inbound PUBLISH's topic. `topic_name` is `Some` when
    /// the PUBLISH carried one; `alias` is the `TopicAlias` property if
    /// present. Binds the alias on first use; errors if the alias is
    /// already bound and a topic name is present too.
    pub fn resolve(&mut self, topic_name: Option<&str>, alias: Option<u16>) -> Result<String, MqttError> {
        match (topic_name, alias) {
            (Some(topic), Some(a)) => {
                if self.alias_to_topic.contains_key(&a) {
                    return Err(MqttError::NotImplemented);
                }
                self.alias_to_topic.insert(a, topic.to_string());
                Ok(topic.to_string())
            }
            (Some(topic), None) => Ok(topic.to_string()),
            (None, Some(a)) => self
                .alias_to_topic
                .get(&a)
                .cloned()
                .ok_or(MqttError::UnknownTopicAlias(a)),
            (None, None) => Err(MqttError::Malformed(
                "PUBLISH carries neither a topic name nor a topic alias".into(),
            )),
        }
    }

    pub fn reset(&mut self) {
        self.alias_to_topic.clear();
    }
}

impl Default for TxAliasTable {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Default for RxAliasTable {
    fn default() -> Self {
        Self::new()
    }
}
