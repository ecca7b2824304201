use std::collections::BTreeSet;
use std::path::PathBuf;

use parking_lot::Mutex;
use port_policy_core::{
    check_conflicts, coalesce_ranges, parse_default_policy, parse_local_policy, plan_operations,
    reconcile, validate_desired, PolicyMap, PortOperation, PortRange,
};

use crate::error::PortPolicyError;
use crate::runner::{CommandRunner, ProcessRunner};
use crate::semanage::{ListScope, Semanage};

/// Shared entry point for reading and changing port labels.
///
/// All reads that must be consistent with each other, and every configure, happen
/// while `lock` is held, so concurrent callers sharing one context never observe or
/// produce a half-applied policy. Reconciliation itself runs outside the lock.
#[derive(Debug)]
pub struct PortPolicyContext<R = ProcessRunner> {
    semanage: Semanage<R>,
    lock: Mutex<()>,
}

impl PortPolicyContext<ProcessRunner> {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self::new(Semanage::system(program))
    }
}

impl<R: CommandRunner> PortPolicyContext<R> {
    pub fn new(semanage: Semanage<R>) -> Self {
        Self {
            semanage,
            lock: Mutex::new(()),
        }
    }

    pub fn semanage(&self) -> &Semanage<R> {
        &self.semanage
    }

    /// Entries added by administrators.
    pub fn local_policy(&self) -> Result<PolicyMap, PortPolicyError> {
        let _guard = self.lock.lock();
        self.read_local()
    }

    /// Entries shipped with the system policy, excluding exact local entries.
    pub fn default_policy(&self) -> Result<PolicyMap, PortPolicyError> {
        let _guard = self.lock.lock();
        let local = self.read_local()?;
        self.read_default(&local)
    }

    /// One type per port for every port of every protocol.
    pub fn get_effective_policy(&self) -> Result<PolicyMap, PortPolicyError> {
        let (local, default) = {
            let _guard = self.lock.lock();
            let local = self.read_local()?;
            let default = self.read_default(&local)?;
            (local, default)
        };
        Ok(reconcile(&local, &default))
    }

    /// Validate `desired` for `label` against local policy without changing anything.
    pub fn check(
        &self,
        desired: &BTreeSet<PortRange>,
        label: &str,
    ) -> Result<(), PortPolicyError> {
        validate_desired(desired)?;
        let _guard = self.lock.lock();
        let local = self.read_local()?;
        check_conflicts(desired, label, &local)?;
        Ok(())
    }

    /// Operations `configure` would issue right now, without issuing them.
    pub fn plan_configure(
        &self,
        desired: &BTreeSet<PortRange>,
        label: &str,
    ) -> Result<Vec<PortOperation>, PortPolicyError> {
        validate_desired(desired)?;
        let _guard = self.lock.lock();
        self.plan_locked(desired, label)
    }

    /// Make `desired` exactly the set of local ports carrying `label` and return the
    /// operations issued, in order.
    ///
    /// Nothing is issued when validation or the conflict scan fails. A failing
    /// operation aborts the run; operations before it are not rolled back.
    pub fn apply_configuration(
        &self,
        desired: &BTreeSet<PortRange>,
        label: &str,
    ) -> Result<Vec<PortOperation>, PortPolicyError> {
        validate_desired(desired)?;
        let _guard = self.lock.lock();
        let operations = self.plan_locked(desired, label)?;
        for (applied, operation) in operations.iter().enumerate() {
            self.semanage
                .apply(operation)
                .map_err(|source| PortPolicyError::Apply {
                    operation: operation.clone(),
                    applied,
                    source,
                })?;
        }
        Ok(operations)
    }

    /// Like [`apply_configuration`](Self::apply_configuration), reporting only
    /// whether anything changed.
    pub fn configure(
        &self,
        desired: &BTreeSet<PortRange>,
        label: &str,
    ) -> Result<bool, PortPolicyError> {
        Ok(!self.apply_configuration(desired, label)?.is_empty())
    }

    // Callers hold `lock`.
    fn plan_locked(
        &self,
        desired: &BTreeSet<PortRange>,
        label: &str,
    ) -> Result<Vec<PortOperation>, PortPolicyError> {
        let local = self.read_local()?;
        check_conflicts(desired, label, &local)?;

        let coalesced = coalesce_ranges(desired);
        let default = if coalesced.is_empty() {
            PolicyMap::new()
        } else {
            self.read_default(&local)?
        };
        let operations = plan_operations(&coalesced, label, &local, &default);
        tracing::debug!(label, planned = operations.len(), "planned port changes");
        Ok(operations)
    }

    fn read_local(&self) -> Result<PolicyMap, PortPolicyError> {
        let text = self.semanage.list(ListScope::Local)?;
        Ok(parse_local_policy(&text)?)
    }

    fn read_default(&self, local: &PolicyMap) -> Result<PolicyMap, PortPolicyError> {
        let text = self.semanage.list(ListScope::All)?;
        Ok(parse_default_policy(&text, local)?)
    }
}
