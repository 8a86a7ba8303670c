use crate::client::constants::UNSET_RTT_MS;
use crate::client::error::{ClientError, Result};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

const UNSENT_OFFSET_MS: i32 = i32::MIN;

/// Send and reply timing for one probe.
///
/// The scheduler owns `sent_offset_ms`, the correlator owns `rtt_ms` and
/// `replied`. Each field has a single writer, so plain atomics are enough.
#[derive(Debug)]
pub struct ProbeSlot {
    sent_offset_ms: AtomicI32,
    rtt_ms: AtomicI32,
    replied: AtomicBool,
}

impl ProbeSlot {
    fn new() -> Self {
        Self {
            sent_offset_ms: AtomicI32::new(UNSENT_OFFSET_MS),
            rtt_ms: AtomicI32::new(UNSET_RTT_MS),
            replied: AtomicBool::new(false),
        }
    }

    /// Milliseconds since session start when the probe went out
    pub fn sent_offset_ms(&self) -> Option<i32> {
        match self.sent_offset_ms.load(Ordering::Acquire) {
            UNSENT_OFFSET_MS => None,
            offset => Some(offset),
        }
    }

    /// Recorded round-trip time, if a reply has arrived
    pub fn rtt_ms(&self) -> Option<i32> {
        if self.replied.load(Ordering::Acquire) {
            Some(self.rtt_ms.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Raw slot value; the unset sentinel when no reply has arrived
    pub fn raw_rtt_ms(&self) -> i32 {
        self.rtt_ms.load(Ordering::Acquire)
    }
}

/// Fixed-length record of every probe in a series, addressed by `sequence - 1`.
#[derive(Debug)]
pub struct Ledger {
    slots: Box<[ProbeSlot]>,
}

impl Ledger {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| ProbeSlot::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot for a 1-based sequence number
    pub fn slot(&self, sequence: i16) -> Result<&ProbeSlot> {
        usize::try_from(sequence)
            .ok()
            .and_then(|seq| seq.checked_sub(1))
            .and_then(|idx| self.slots.get(idx))
            .ok_or(ClientError::UnknownSequence(sequence))
    }

    pub fn record_sent(&self, sequence: i16, offset_ms: i32) -> Result<()> {
        self.slot(sequence)?
            .sent_offset_ms
            .store(offset_ms, Ordering::Release);
        Ok(())
    }

    /// Store a round-trip time. Always writes; returns the value it replaced
    /// when the slot had already been filled.
    pub fn record_rtt(&self, sequence: i16, rtt_ms: i32) -> Result<Option<i32>> {
        let slot = self.slot(sequence)?;
        let previous = slot.rtt_ms.swap(rtt_ms, Ordering::AcqRel);
        let was_replied = slot.replied.swap(true, Ordering::AcqRel);
        Ok(was_replied.then_some(previous))
    }

    /// Every slot's RTT in sequence order, sentinel included for unanswered probes
    pub fn rtts(&self) -> Vec<i32> {
        self.slots.iter().map(ProbeSlot::raw_rtt_ms).collect()
    }

    pub fn replied_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.replied.load(Ordering::Acquire))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ledger_is_unset() {
        let ledger = Ledger::new(3);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.rtts(), vec![UNSET_RTT_MS; 3]);
        assert_eq!(ledger.replied_count(), 0);
        assert!(ledger.iter().all(|s| s.sent_offset_ms().is_none()));
    }

    #[test]
    fn test_record_sent_and_rtt() -> Result<()> {
        let ledger = Ledger::new(2);
        ledger.record_sent(2, 40)?;
        assert_eq!(ledger.record_rtt(2, 7)?, None);

        let slot = ledger.slot(2)?;
        assert_eq!(slot.sent_offset_ms(), Some(40));
        assert_eq!(slot.rtt_ms(), Some(7));
        assert_eq!(ledger.rtts(), vec![UNSET_RTT_MS, 7]);
        assert_eq!(ledger.replied_count(), 1);
        Ok(())
    }

    #[test]
    fn test_second_write_overwrites_and_reports_previous() -> Result<()> {
        let ledger = Ledger::new(1);
        assert_eq!(ledger.record_rtt(1, 5)?, None);
        assert_eq!(ledger.record_rtt(1, 9)?, Some(5));
        assert_eq!(ledger.slot(1)?.rtt_ms(), Some(9));
        Ok(())
    }

    #[test]
    fn test_sentinel_valued_rtt_still_counts_as_set() -> Result<()> {
        let ledger = Ledger::new(1);
        assert_eq!(ledger.record_rtt(1, UNSET_RTT_MS)?, None);
        assert_eq!(ledger.slot(1)?.rtt_ms(), Some(UNSET_RTT_MS));
        assert_eq!(ledger.record_rtt(1, 3)?, Some(UNSET_RTT_MS));
        Ok(())
    }

    #[test]
    fn test_out_of_range_sequence() {
        let ledger = Ledger::new(4);
        for seq in [0, 5, -1, i16::MIN] {
            assert!(matches!(
                ledger.record_rtt(seq, 1),
                Err(ClientError::UnknownSequence(s)) if s == seq
            ));
        }
    }
}
