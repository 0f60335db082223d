//! Compact trigger records.
//!
//! Each trigger is stored as three SizeCodec values: the ordinal of its key in the detector
//! status trigger map, its start time as a delta against the previous trigger in start-time
//! order (the first anchored at [`TMIN`]), and its length. Times are quantized to 1 ns.
//!
//! The key ordinal is only meaningful against a trigger map with the same keys in the same
//! order as the one used for encoding.

use std::collections::BTreeMap;
use std::fmt;

use bytes::{Buf, BufMut};

use crate::quantize::{self, Version};
use crate::size::{SizeCodecBuf, SizeCodecBufMut};
use crate::{DecodeError, EncodeError, TMIN};

/// Subsystem that issued a trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceId {
    InIce = 0,
    IceTop = 10,
    AmandaTwrDaq = 20,
    External = 30,
    Global = 40,
    AmandaMuonDaq = 50,
    Spase = 70,
    UnknownSource = 80,
}

/// Trigger algorithm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriggerType {
    SimpleMultiplicity = 0,
    Calibration = 10,
    MinBias = 20,
    Throughput = 30,
    TwoCoincidence = 40,
    ThreeCoincidence = 50,
    Merged = 70,
    SlowParticle = 80,
    FragmentMultiplicity = 105,
    String = 120,
    Volume = 125,
    Sphere = 127,
    Unbiased = 129,
    Spase2 = 170,
    UnknownType = 180,
}

impl TriggerType {
    /// Types that legitimately appear without a config ID.
    pub const fn allows_missing_config(self) -> bool {
        matches!(
            self,
            TriggerType::Throughput
                | TriggerType::Merged
                | TriggerType::TwoCoincidence
                | TriggerType::ThreeCoincidence
        )
    }
}

/// Identifies a configured trigger. Ordered by source, type, then config ID.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerKey {
    pub source: SourceId,
    pub trigger_type: TriggerType,
    pub config_id: Option<i32>,
}

impl TriggerKey {
    pub const fn new(source: SourceId, trigger_type: TriggerType, config_id: i32) -> Self {
        Self {
            source,
            trigger_type,
            config_id: Some(config_id),
        }
    }

    pub const fn without_config(source: SourceId, trigger_type: TriggerType) -> Self {
        Self {
            source,
            trigger_type,
            config_id: None,
        }
    }

    pub const fn check_config_id(&self) -> bool {
        self.config_id.is_some()
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.config_id {
            Some(id) => write!(f, "[{:?}:{:?}:{}]", self.source, self.trigger_type, id),
            None => write!(f, "[{:?}:{:?}]", self.source, self.trigger_type),
        }
    }
}

/// Configuration of one trigger in the detector status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerStatus {
    pub name: String,
    pub settings: BTreeMap<String, String>,
}

/// The part of the detector status the trigger codec depends on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectorStatus {
    pub trigger_status: BTreeMap<TriggerKey, TriggerStatus>,
}

impl DetectorStatus {
    /// Trigger keys in map order; the order key ordinals refer to.
    pub fn trigger_keys(&self) -> Vec<TriggerKey> {
        self.trigger_status.keys().copied().collect()
    }
}

/// A trigger in a trigger hierarchy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Trigger {
    pub key: TriggerKey,
    /// Start time in ns.
    pub time: f64,
    /// Length in ns.
    pub length: f64,
    pub fired: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TriggerNode {
    pub trigger: Trigger,
    pub children: Vec<TriggerNode>,
}

impl TriggerNode {
    pub fn add_child(&mut self, trigger: Trigger) -> &mut TriggerNode {
        self.children.push(TriggerNode {
            trigger,
            children: Vec::new(),
        });
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

/// A forest of triggers; merged triggers own the triggers they merge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerHierarchy {
    roots: Vec<TriggerNode>,
}

impl TriggerHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, trigger: Trigger) -> &mut TriggerNode {
        self.roots.push(TriggerNode {
            trigger,
            children: Vec::new(),
        });
        let last = self.roots.len() - 1;
        &mut self.roots[last]
    }

    pub fn roots(&self) -> &[TriggerNode] {
        &self.roots
    }

    /// Depth-first, pre-order walk over every trigger.
    pub fn iter(&self) -> TriggerIter<'_> {
        TriggerIter {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub struct TriggerIter<'a> {
    stack: Vec<&'a TriggerNode>,
}

impl<'a> Iterator for TriggerIter<'a> {
    type Item = &'a Trigger;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(&node.trigger)
    }
}

/// One compressed trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SuperDstTrigger {
    key_idx: u32,
    startcode: u32,
    lengthcode: u32,
}

impl SuperDstTrigger {
    /// Quantize `trigger`, resolving its key against `status`. The start code is absolute
    /// until the owning series relativizes it.
    pub fn new(trigger: &Trigger, status: &DetectorStatus) -> Result<Self, EncodeError> {
        let key_idx = status
            .trigger_status
            .keys()
            .position(|k| *k == trigger.key)
            .ok_or(EncodeError::UnknownTriggerKey(trigger.key))?;
        if !(trigger.time >= TMIN) {
            return Err(EncodeError::TimeBeforeEpoch {
                time: trigger.time,
                tmin: TMIN,
            });
        }
        if !(trigger.length >= 0.0 && trigger.length.is_finite()) {
            return Err(EncodeError::NegativeLength(trigger.length));
        }
        Ok(Self {
            key_idx: key_idx as u32,
            startcode: quantize::encode_bounded_time(trigger.time - TMIN, Version::V1)
                .map_err(|_| EncodeError::TimeNotRepresentable(trigger.time))?,
            lengthcode: quantize::encode_bounded_time(trigger.length, Version::V1)?,
        })
    }

    pub fn key_idx(&self) -> u32 {
        self.key_idx
    }

    pub fn startcode(&self) -> u32 {
        self.startcode
    }

    pub fn lengthcode(&self) -> u32 {
        self.lengthcode
    }
}

/// Compressed triggers in ascending start-time order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuperDstTriggerSeries {
    triggers: Vec<SuperDstTrigger>,
}

impl SuperDstTriggerSeries {
    /// Compress every trigger in `hierarchy`.
    ///
    /// Triggers whose key lacks a config ID are skipped when their type is one of the
    /// config-less types and rejected otherwise.
    pub fn new(hierarchy: &TriggerHierarchy, status: &DetectorStatus) -> Result<Self, EncodeError> {
        let mut triggers = Vec::new();
        for trigger in hierarchy.iter() {
            if !trigger.key.check_config_id() {
                if trigger.key.trigger_type.allows_missing_config() {
                    tracing::debug!(key = %trigger.key, "skipping trigger without config ID");
                    continue;
                }
                return Err(EncodeError::MissingConfigId(trigger.key));
            }
            triggers.push(SuperDstTrigger::new(trigger, status)?);
        }

        triggers.sort_by_key(|t| t.startcode);
        for i in (1..triggers.len()).rev() {
            triggers[i].startcode -= triggers[i - 1].startcode;
        }
        Ok(Self { triggers })
    }

    pub fn triggers(&self) -> &[SuperDstTrigger] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn save<B: BufMut>(&self, buf: &mut B) {
        buf.put_size(self.triggers.len() as u64);
        for t in &self.triggers {
            buf.put_size(t.key_idx.into());
            buf.put_size(t.startcode.into());
            buf.put_size(t.lengthcode.into());
        }
    }

    pub fn load<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let count: usize = buf.get_size_as()?;
        // Every record takes at least three bytes.
        let mut triggers = Vec::with_capacity(count.min(buf.remaining() / 3));
        for _ in 0..count {
            triggers.push(SuperDstTrigger {
                key_idx: buf.get_size_as()?,
                startcode: buf.get_size_as()?,
                lengthcode: buf.get_size_as()?,
            });
        }
        Ok(Self { triggers })
    }

    /// Rebuild a flat trigger hierarchy, resolving key ordinals against `status`.
    pub fn unpack(&self, status: &DetectorStatus) -> Result<TriggerHierarchy, DecodeError> {
        self.unpack_with_keys(&status.trigger_keys())
    }

    /// Rebuild a flat trigger hierarchy, resolving key ordinals against `keys`, which must be
    /// the strictly ordered key list of the trigger map used for encoding.
    pub fn unpack_with_keys(&self, keys: &[TriggerKey]) -> Result<TriggerHierarchy, DecodeError> {
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DecodeError::UnorderedTriggerKeys);
        }
        let mut hierarchy = TriggerHierarchy::new();
        let mut t = 0u64;
        for st in &self.triggers {
            let key = *keys
                .get(st.key_idx as usize)
                .ok_or(DecodeError::TriggerIndexOutOfRange {
                    index: st.key_idx.into(),
                    len: keys.len(),
                })?;
            t += u64::from(st.startcode);
            hierarchy.add_root(Trigger {
                key,
                time: TMIN + quantize::decode_time(t, Version::V1),
                length: quantize::decode_time(st.lengthcode.into(), Version::V1),
                fired: true,
            });
        }
        Ok(hierarchy)
    }
}
