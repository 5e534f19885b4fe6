use pulsetrack_common::{FailureLogEntry, RecordKind};

/// updated/skipped/failed counters for one record kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindCounts {
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl KindCounts {
    pub fn total(&self) -> u32 {
        self.updated + self.skipped + self.failed
    }
}

/// Stats from one sync run. Owned by the sync coordinator, handed to the
/// reporting pipeline, then discarded.
#[derive(Debug, Default, PartialEq)]
pub struct RunStats {
    pub leads: KindCounts,
    pub accounts: KindCounts,
    pub failures: Vec<FailureLogEntry>,
}

impl RunStats {
    pub fn counts(&self, kind: RecordKind) -> &KindCounts {
        match kind {
            RecordKind::Lead => &self.leads,
            RecordKind::Account => &self.accounts,
        }
    }

    pub fn counts_mut(&mut self, kind: RecordKind) -> &mut KindCounts {
        match kind {
            RecordKind::Lead => &mut self.leads,
            RecordKind::Account => &mut self.accounts,
        }
    }

    pub fn total_processed(&self) -> u32 {
        self.leads.total() + self.accounts.total()
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Sync Run Complete ===")?;
        writeln!(f, "Records processed: {}", self.total_processed())?;
        for kind in [RecordKind::Lead, RecordKind::Account] {
            let c = self.counts(kind);
            writeln!(
                f,
                "{:<9} updated {}, skipped {}, failed {}",
                format!("{kind}s:"),
                c.updated,
                c.skipped,
                c.failed
            )?;
        }
        writeln!(f, "Failures logged:   {}", self.failures.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_route_by_kind() {
        let mut stats = RunStats::default();
        stats.counts_mut(RecordKind::Lead).updated += 1;
        stats.counts_mut(RecordKind::Account).skipped += 1;
        assert_eq!(stats.leads.updated, 1);
        assert_eq!(stats.accounts.skipped, 1);
        assert_eq!(stats.total_processed(), 2);
    }

    #[test]
    fn display_renders_both_kinds() {
        let mut stats = RunStats::default();
        stats.leads.updated = 3;
        stats.accounts.failed = 1;
        let rendered = stats.to_string();
        assert!(rendered.contains("Leads:    updated 3, skipped 0, failed 0"));
        assert!(rendered.contains("Accounts: updated 0, skipped 0, failed 1"));
    }
}
