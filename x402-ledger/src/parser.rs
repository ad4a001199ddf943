//! Balance-delta transaction parsing (C3).
//!
//! Chosen over instruction-decoding because it is robust to inner
//! instructions, CPI wrapping, and instruction-set evolution: whatever path
//! value took through the token program, the pre/post balance snapshot
//! reflects where it ended up.

use std::collections::HashMap;

use x402_core::TransferRecord;

use crate::client::TransactionRecord;

/// Maximum base-unit asymmetry tolerated when pairing a credit against a
/// debit (§4.2 step 6). Defensive: the deployed asset has no transfer fee,
/// so pairs match exactly today.
pub const TRANSFER_TOLERANCE_BASE_UNITS: u64 = 100;

#[derive(Debug, Clone)]
struct Delta {
    account_index: u8,
    mint: String,
    owner: Option<String>,
    amount: u64,
}

/// Extracts every token transfer from a transaction's balance snapshot, in
/// arrival (ascending account-index) order.
///
/// # Errors
///
/// Returns an empty `Vec` rather than an error when no transfer is found —
/// callers distinguish "no transfer at all" (`NoTokenTransfer`) from "a
/// transfer exists but doesn't satisfy the requirement" (`TransferMismatch`)
/// themselves, since both are legitimate states for a well-formed
/// transaction.
#[must_use]
pub fn parse_transfers(tx: &TransactionRecord) -> Vec<TransferRecord> {
    let mut pre: HashMap<u8, (String, Option<String>, u64)> = HashMap::new();
    for balance in &tx.pre_token_balances {
        pre.insert(balance.account_index, (balance.mint.clone(), balance.owner.clone(), balance.amount));
    }
    let mut post: HashMap<u8, (String, Option<String>, u64)> = HashMap::new();
    for balance in &tx.post_token_balances {
        post.insert(balance.account_index, (balance.mint.clone(), balance.owner.clone(), balance.amount));
    }

    let mut indices: Vec<u8> = pre.keys().chain(post.keys()).copied().collect();
    indices.sort_unstable();
    indices.dedup();

    let mut credits = Vec::new();
    let mut debits = Vec::new();

    for index in indices {
        let pre_entry = pre.get(&index);
        let post_entry = post.get(&index);
        let pre_amount = pre_entry.map_or(0, |e| e.2);
        let post_amount = post_entry.map_or(0, |e| e.2);
        let mint = post_entry.or(pre_entry).map_or_else(String::new, |e| e.0.clone());
        let owner = post_entry.or(pre_entry).and_then(|e| e.1.clone());

        match post_amount.cmp(&pre_amount) {
            std::cmp::Ordering::Greater => credits.push(Delta { account_index: index, mint, owner, amount: post_amount - pre_amount }),
            std::cmp::Ordering::Less => debits.push(Delta { account_index: index, mint, owner, amount: pre_amount - post_amount }),
            std::cmp::Ordering::Equal => {}
        }
    }

    let mut used_debits = vec![false; debits.len()];
    let mut records = Vec::new();

    for credit in &credits {
        let Some((debit_pos, debit)) = debits.iter().enumerate().find(|(pos, debit)| {
            !used_debits[*pos] && debit.mint == credit.mint && credit.amount.abs_diff(debit.amount) <= TRANSFER_TOLERANCE_BASE_UNITS
        }) else {
            continue;
        };
        used_debits[debit_pos] = true;

        let destination = account_key(tx, credit.account_index);
        let source = account_key(tx, debit.account_index);
        let authority = debit.owner.clone().unwrap_or_else(|| source.clone());

        records.push(TransferRecord { source, destination, authority, amount: credit.amount, mint: credit.mint.clone() });
    }

    records
}

fn account_key(tx: &TransactionRecord, index: u8) -> String {
    tx.account_keys.get(index as usize).cloned().unwrap_or_else(|| index.to_string())
}

#[cfg(test)]
mod tests {
    use crate::client::TokenBalanceRecord;

    use super::*;

    fn tx_with_balances(pre: Vec<TokenBalanceRecord>, post: Vec<TokenBalanceRecord>) -> TransactionRecord {
        TransactionRecord {
            account_keys: vec!["W".to_string(), "R".to_string()],
            error: None,
            pre_token_balances: pre,
            post_token_balances: post,
            block_time: Some(0),
            slot: 1,
        }
    }

    #[test]
    fn pairs_a_single_credit_and_debit() {
        let tx = tx_with_balances(
            vec![TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 5000 }],
            vec![
                TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 4000 },
                TokenBalanceRecord { account_index: 1, mint: "A".to_string(), owner: Some("R".to_string()), amount: 1000 },
            ],
        );
        let transfers = parse_transfers(&tx);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount, 1000);
        assert_eq!(transfers[0].destination, "R");
        assert_eq!(transfers[0].source, "W");
        assert_eq!(transfers[0].authority, "W");
    }

    #[test]
    fn no_balances_means_no_transfers() {
        let tx = tx_with_balances(vec![], vec![]);
        assert!(parse_transfers(&tx).is_empty());
    }

    #[test]
    fn tolerates_small_asymmetry() {
        let tx = tx_with_balances(
            vec![TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 10_000 }],
            vec![
                TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 9000 },
                TokenBalanceRecord { account_index: 1, mint: "A".to_string(), owner: Some("R".to_string()), amount: 950 },
            ],
        );
        let transfers = parse_transfers(&tx);
        assert_eq!(transfers.len(), 1);
    }

    #[test]
    fn rejects_asymmetry_beyond_tolerance() {
        let tx = tx_with_balances(
            vec![TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 10_000 }],
            vec![
                TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 9000 },
                TokenBalanceRecord { account_index: 1, mint: "A".to_string(), owner: Some("R".to_string()), amount: 500 },
            ],
        );
        assert!(parse_transfers(&tx).is_empty());
    }

    #[test]
    fn second_of_two_transfers_can_match() {
        let tx = TransactionRecord {
            account_keys: vec!["W".to_string(), "R1".to_string(), "R2".to_string()],
            error: None,
            pre_token_balances: vec![TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 10_000 }],
            post_token_balances: vec![
                TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 4000 },
                TokenBalanceRecord { account_index: 1, mint: "A".to_string(), owner: Some("R1".to_string()), amount: 1000 },
                TokenBalanceRecord { account_index: 2, mint: "A".to_string(), owner: Some("R2".to_string()), amount: 5000 },
            ],
        };
        let transfers = parse_transfers(&tx);
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().any(|t| t.destination == "R2" && t.amount == 5000));
    }
}
