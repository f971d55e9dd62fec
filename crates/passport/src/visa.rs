//! Per-aggregate-instance capability evaluator.

/// A visa bound to (actor, aggregate instance).
///
/// `determine_if` supplies a fixed permission snapshot for this visa and
/// returns the predicate's boolean result; it never itself errors. Ownership
/// relative fields in the snapshot are frozen at visa construction, so a visa
/// must not be reused across different aggregate instances; each instance
/// computes and caches its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visa<P> {
    /// Every predicate evaluates to `false`, including `|_| true`.
    Deny,
    /// Predicates evaluate against this frozen snapshot.
    Grant(P),
}

impl<P> Visa<P> {
    /// Evaluate a predicate over the permission snapshot.
    pub fn determine_if<F>(&self, predicate: F) -> bool
    where
        F: FnOnce(&P) -> bool,
    {
        match self {
            Visa::Deny => false,
            Visa::Grant(permissions) => predicate(permissions),
        }
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Visa::Deny)
    }
}

#[cfg(test)]
mod tests {
    use super::Visa;
    use crate::permissions::TicketPermissions;

    #[test]
    fn deny_rejects_even_the_trivially_true_predicate() {
        let visa: Visa<TicketPermissions> = Visa::Deny;
        assert!(!visa.determine_if(|_| true));
    }

    #[test]
    fn grant_evaluates_the_predicate_against_the_snapshot() {
        let visa = Visa::Grant(TicketPermissions {
            can_create_tickets: true,
            ..Default::default()
        });
        assert!(visa.determine_if(|p| p.can_create_tickets));
        assert!(!visa.determine_if(|p| p.can_manage_tickets));
    }
}
