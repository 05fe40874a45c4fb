//! Deterministic naming of destination snapshots

const COPIED_FROM_INFIX: &str = "-copied-from-";

/// Identifier of the destination copy of `source_snapshot_id`
///
/// Depends only on the source identifier and account, so every version of a
/// source snapshot that reuses a name maps to the same destination name.
///
/// ```
/// use snapcopy_core::naming::destination_snapshot_identifier;
///
/// assert_eq!(
///     destination_snapshot_identifier("snap-2024-01-01", "111111111111"),
///     "snap-2024-01-01-copied-from-111111111111"
/// );
/// ```
pub fn destination_snapshot_identifier(
    source_snapshot_id: &str,
    source_account_id: &str,
) -> String {
    format!("{source_snapshot_id}{COPIED_FROM_INFIX}{source_account_id}")
}

/// True when `identifier` looks like a copy made from `source_account_id`
///
/// The account must be the full suffix; `-copied-from-1111` does not match
/// account `111`, and the original name part must be non-empty.
pub fn is_copied_from(identifier: &str, source_account_id: &str) -> bool {
    let suffix = format!("{COPIED_FROM_INFIX}{source_account_id}");
    identifier.len() > suffix.len() && identifier.ends_with(&suffix)
}
