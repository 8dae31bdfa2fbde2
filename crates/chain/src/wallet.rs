//! Wallet-side transaction builder.
//!
//! A wallet stages unlocked inputs and pending outputs, then turns them into
//! a transaction once the inputs cover the outputs plus the fee. Every input
//! is checked against the wallet's ledger snapshot before it is staged, so a
//! built transaction only fails in the miner if the ledger moved on.

use scriptchain_assembler::{assemble, AssemblerError};
use scriptchain_consensus::{TransactionError, TransactionValidator};
use scriptchain_core::{
    script, Hash, Keypair, OutPoint, PublicKey, Transaction, TxInput, TxOutput,
};
use scriptchain_ledger::LedgerSnapshot;
use scriptchain_vm::CheckSigPolicy;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalletError {
    #[error("output {0} is already spent or never existed")]
    AlreadySpent(OutPoint),

    #[error("output {0} is already staged")]
    AlreadyStaged(OutPoint),

    #[error("unlock script does not satisfy output {0}")]
    UnlockFailed(OutPoint),

    #[error("script error: {0}")]
    Script(#[from] AssemblerError),

    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("no inputs are staged")]
    NoInputs,

    #[error("no staged item at index {0}")]
    IndexOutOfRange(usize),

    #[error("staged inputs or outputs must be empty for a transfer")]
    StagingInProgress,

    #[error("value overflow")]
    ValueOverflow,
}

pub type Result<T> = std::result::Result<T, WalletError>;

/// An input that passed its unlock check, with the value it brings in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInput {
    pub input: TxInput,
    pub value: u64,
}

/// A key pair plus its staged, not yet built, transaction.
pub struct Wallet {
    keypair: Keypair,
    snapshot: LedgerSnapshot,
    checksig: CheckSigPolicy,
    inputs: Vec<StagedInput>,
    outputs: Vec<TxOutput>,
    /// Outputs spent by transactions built since the last sync.
    reserved: HashSet<OutPoint>,
}

impl Wallet {
    pub fn new(keypair: Keypair, snapshot: LedgerSnapshot, checksig: CheckSigPolicy) -> Self {
        Self {
            keypair,
            snapshot,
            checksig,
            inputs: Vec::new(),
            outputs: Vec::new(),
            reserved: HashSet::new(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// The pay-to-public-key script that locks coins to this wallet.
    pub fn lock_script(&self) -> String {
        script::pay_to_pubkey(&self.keypair.public_key)
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    /// Replace the ledger view after a block is accepted.
    pub fn sync(&mut self, snapshot: LedgerSnapshot) {
        self.snapshot = snapshot;
        self.reserved.clear();
    }

    /// Check `unlock_source` against the referenced output and stage it.
    ///
    /// Fails without touching staged state if the reference is not
    /// spendable, already staged, or the script does not unlock it.
    pub fn try_unlock(
        &mut self,
        tx_hash: Hash,
        output_index: u32,
        unlock_source: &str,
    ) -> Result<TxInput> {
        let point = OutPoint::new(tx_hash, output_index);
        if self.inputs.iter().any(|s| s.input.outpoint() == point) {
            return Err(WalletError::AlreadyStaged(point));
        }
        let output = self
            .snapshot
            .unspent_output(&point)
            .cloned()
            .ok_or(WalletError::AlreadySpent(point))?;

        TransactionValidator::check_spend(point, unlock_source, &output, self.checksig).map_err(
            |err| match err {
                TransactionError::Script { source, .. } => WalletError::Script(source),
                _ => WalletError::UnlockFailed(point),
            },
        )?;

        let input = TxInput::new(point, unlock_source);
        self.inputs.push(StagedInput {
            input: input.clone(),
            value: output.value,
        });
        debug!(%point, value = output.value, "staged input");
        Ok(input)
    }

    /// Unlock an output paid to this wallet's own key.
    pub fn unlock_own(&mut self, point: OutPoint) -> Result<TxInput> {
        let unlock = script::unlock_pubkey(&self.keypair, &point);
        self.try_unlock(point.tx_hash, point.index, &unlock)
    }

    /// Stage an output. The lock script is assembled but not executed.
    pub fn stage_output(&mut self, value: u64, lock_source: &str) -> Result<()> {
        assemble(lock_source)?;
        self.outputs.push(TxOutput::new(value, lock_source));
        Ok(())
    }

    /// Remove a staged input by 0-based index.
    pub fn remove_input(&mut self, index: usize) -> Result<TxInput> {
        if index >= self.inputs.len() {
            return Err(WalletError::IndexOutOfRange(index));
        }
        Ok(self.inputs.remove(index).input)
    }

    /// Remove a staged output by 0-based index.
    pub fn remove_output(&mut self, index: usize) -> Result<TxOutput> {
        if index >= self.outputs.len() {
            return Err(WalletError::IndexOutOfRange(index));
        }
        Ok(self.outputs.remove(index))
    }

    pub fn staged_inputs(&self) -> &[StagedInput] {
        &self.inputs
    }

    pub fn staged_outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn staged_input_value(&self) -> u64 {
        self.inputs.iter().map(|s| s.value).sum()
    }

    pub fn staged_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Build a transaction from everything staged.
    ///
    /// Staged inputs must cover staged outputs plus `required_fee`. On
    /// success both staged lists are cleared; on failure nothing changes.
    pub fn build_transaction(&mut self, required_fee: u64) -> Result<Transaction> {
        if self.inputs.is_empty() {
            return Err(WalletError::NoInputs);
        }
        let available = self
            .inputs
            .iter()
            .try_fold(0u64, |acc, s| acc.checked_add(s.value))
            .ok_or(WalletError::ValueOverflow)?;
        let required = self
            .outputs
            .iter()
            .try_fold(required_fee, |acc, o| acc.checked_add(o.value))
            .ok_or(WalletError::ValueOverflow)?;
        if available < required {
            return Err(WalletError::InsufficientFunds {
                available,
                required,
            });
        }

        let inputs: Vec<TxInput> = self.inputs.drain(..).map(|s| s.input).collect();
        let outputs = std::mem::take(&mut self.outputs);
        self.reserved.extend(inputs.iter().map(|i| i.outpoint()));

        let tx = Transaction::new(inputs, outputs);
        debug!(tx = %tx.hash(), fee = available - required + required_fee, "built transaction");
        Ok(tx)
    }

    /// Unspent outputs locked to this wallet's key.
    pub fn spendable_outputs(&self) -> Vec<(OutPoint, TxOutput)> {
        let lock = self.lock_script();
        self.snapshot
            .unspent_outputs()
            .filter(|(_, output)| output.lock_script == lock)
            .map(|(point, output)| (point, output.clone()))
            .collect()
    }

    /// Total value of [`Wallet::spendable_outputs`].
    pub fn balance(&self) -> u64 {
        self.spendable_outputs().iter().map(|(_, o)| o.value).sum()
    }

    /// Pick own outputs worth at least `target`: fewest inputs first, then
    /// the lowest total. Outputs reserved by earlier transfers are skipped.
    pub fn select_coins(&self, target: u64) -> Option<Vec<(OutPoint, u64)>> {
        let mut pool: Vec<(OutPoint, u64)> = self
            .spendable_outputs()
            .into_iter()
            .filter(|(point, _)| !self.reserved.contains(point))
            .map(|(point, output)| (point, output.value))
            .collect();
        select_coins(&mut pool, target)
    }

    /// Pay `amount` to `to`, returning any change to `change_to`.
    ///
    /// Selects coins, unlocks them with this wallet's key and builds a
    /// transaction paying `fee`. Requires empty staging.
    pub fn transfer(
        &mut self,
        to: &PublicKey,
        amount: u64,
        change_to: &PublicKey,
        fee: u64,
    ) -> Result<Transaction> {
        if !self.inputs.is_empty() || !self.outputs.is_empty() {
            return Err(WalletError::StagingInProgress);
        }
        let required = amount.checked_add(fee).ok_or(WalletError::ValueOverflow)?;
        let selected = self.select_coins(required).ok_or_else(|| {
            WalletError::InsufficientFunds {
                available: self.available(),
                required,
            }
        })?;

        let result = self.stage_transfer(&selected, to, amount, change_to, required);
        match result {
            Ok(()) => self.build_transaction(fee),
            Err(err) => {
                self.inputs.clear();
                self.outputs.clear();
                Err(err)
            }
        }
    }

    fn stage_transfer(
        &mut self,
        selected: &[(OutPoint, u64)],
        to: &PublicKey,
        amount: u64,
        change_to: &PublicKey,
        required: u64,
    ) -> Result<()> {
        for (point, _) in selected {
            self.unlock_own(*point)?;
        }
        self.stage_output(amount, &script::pay_to_pubkey(to))?;
        let change = self.staged_input_value() - required;
        if change > 0 {
            self.stage_output(change, &script::pay_to_pubkey(change_to))?;
        }
        Ok(())
    }

    fn available(&self) -> u64 {
        self.spendable_outputs()
            .iter()
            .filter(|(point, _)| !self.reserved.contains(point))
            .map(|(_, o)| o.value)
            .sum()
    }
}

/// Greedy coin selection over `(point, value)` pairs.
///
/// Takes the smallest count `k` whose largest values reach `target`, then
/// fills the `k` slots one by one with the smallest value that still lets
/// the remaining slots reach the target.
fn select_coins(pool: &mut Vec<(OutPoint, u64)>, target: u64) -> Option<Vec<(OutPoint, u64)>> {
    pool.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut k = 0;
    let mut top: u64 = 0;
    for (_, value) in pool.iter().rev() {
        if top >= target && k > 0 {
            break;
        }
        top = top.saturating_add(*value);
        k += 1;
    }
    if top < target || k == 0 {
        return None;
    }

    let mut chosen = Vec::with_capacity(k);
    let mut needed = target;
    for slot in 0..k {
        let rest = k - slot - 1;
        let pick = (0..pool.len()).find(|&i| {
            let others: u64 = pool
                .iter()
                .enumerate()
                .rev()
                .filter(|(j, _)| *j != i)
                .take(rest)
                .map(|(_, (_, v))| *v)
                .fold(0u64, |acc, v| acc.saturating_add(v));
            pool[i].1.saturating_add(others) >= needed
        })?;
        let coin = pool.remove(pick);
        needed = needed.saturating_sub(coin.1);
        chosen.push(coin);
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptchain_core::{Block, BlockHeader};
    use scriptchain_ledger::LedgerState;

    /// A ledger whose first block pays each value to `owner`.
    fn funded_ledger(owner: &PublicKey, values: &[u64]) -> (LedgerState, Transaction) {
        let mut state = LedgerState::new();
        let outputs = values
            .iter()
            .map(|v| TxOutput::new(*v, script::pay_to_pubkey(owner)))
            .collect();
        let mut coinbase = Transaction::coinbase(0, 0, "");
        coinbase.outputs = outputs;
        let header = BlockHeader {
            previous_hash: Hash::ZERO,
            merkle_root: Hash::ZERO,
            height: 0,
            difficulty: 0,
            nonce: 0,
        };
        let mut utxos = state.utxos.clone();
        utxos.add_outputs(&coinbase);
        state.commit(Block::new(header, vec![coinbase.clone()], *owner), utxos);
        (state, coinbase)
    }

    fn wallet_with(values: &[u64]) -> (Wallet, Transaction) {
        let keypair = Keypair::generate();
        let (state, coinbase) = funded_ledger(&keypair.public_key, values);
        let wallet = Wallet::new(keypair, state.snapshot(), CheckSigPolicy::Verify);
        (wallet, coinbase)
    }

    #[test]
    fn test_try_unlock_stages_input() {
        let (mut wallet, coinbase) = wallet_with(&[500]);
        let point = OutPoint::new(coinbase.hash(), 0);
        let unlock = script::unlock_pubkey(wallet.keypair(), &point);

        let input = wallet.try_unlock(point.tx_hash, 0, &unlock).unwrap();
        assert_eq!(input.outpoint(), point);
        assert_eq!(wallet.staged_input_value(), 500);

        assert_eq!(
            wallet.try_unlock(point.tx_hash, 0, &unlock),
            Err(WalletError::AlreadyStaged(point))
        );
    }

    #[test]
    fn test_try_unlock_failures_leave_state() {
        let (mut wallet, coinbase) = wallet_with(&[500, 10]);
        let point = OutPoint::new(coinbase.hash(), 0);
        wallet.unlock_own(point).unwrap();

        let other = OutPoint::new(coinbase.hash(), 1);
        let stranger = Keypair::generate();
        let forged = script::unlock_pubkey(&stranger, &other);
        assert_eq!(
            wallet.try_unlock(other.tx_hash, 1, &forged),
            Err(WalletError::UnlockFailed(other))
        );
        assert!(matches!(
            wallet.try_unlock(other.tx_hash, 1, "\"unterminated"),
            Err(WalletError::Script(_))
        ));
        assert_eq!(
            wallet.try_unlock(Hash::ZERO, 0, ""),
            Err(WalletError::AlreadySpent(OutPoint::new(Hash::ZERO, 0)))
        );
        assert_eq!(wallet.staged_inputs().len(), 1);
    }

    #[test]
    fn test_stage_and_remove() {
        let (mut wallet, _) = wallet_with(&[1]);
        wallet.stage_output(5, "OP_1").unwrap();
        wallet.stage_output(6, "OP_2").unwrap();
        assert!(matches!(wallet.stage_output(7, "OP_NOPE"), Err(WalletError::Script(_))));
        assert_eq!(wallet.staged_output_value(), 11);

        assert_eq!(wallet.remove_output(0).unwrap().value, 5);
        assert_eq!(wallet.remove_output(1), Err(WalletError::IndexOutOfRange(1)));
        assert_eq!(wallet.remove_input(0), Err(WalletError::IndexOutOfRange(0)));
        assert_eq!(wallet.staged_outputs().len(), 1);
    }

    #[test]
    fn test_build_transaction() {
        let (mut wallet, coinbase) = wallet_with(&[500]);
        let point = OutPoint::new(coinbase.hash(), 0);
        wallet.unlock_own(point).unwrap();
        wallet.stage_output(450, "OP_1").unwrap();

        assert_eq!(
            wallet.build_transaction(100),
            Err(WalletError::InsufficientFunds {
                available: 500,
                required: 550
            })
        );
        assert_eq!(wallet.staged_inputs().len(), 1);
        assert_eq!(wallet.staged_outputs().len(), 1);

        let tx = wallet.build_transaction(50).unwrap();
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.total_output(), 450);
        assert!(wallet.staged_inputs().is_empty());
        assert!(wallet.staged_outputs().is_empty());
    }

    #[test]
    fn test_build_without_inputs_fails() {
        let (mut wallet, _) = wallet_with(&[500]);
        wallet.stage_output(0, "OP_1").unwrap();
        assert_eq!(wallet.build_transaction(0), Err(WalletError::NoInputs));
        assert_eq!(wallet.staged_outputs().len(), 1);
    }

    #[test]
    fn test_balance_counts_own_outputs() {
        let (wallet, _) = wallet_with(&[3, 4, 5]);
        assert_eq!(wallet.balance(), 12);
        assert_eq!(wallet.spendable_outputs().len(), 3);

        let other = Wallet::new(
            Keypair::generate(),
            wallet.snapshot().clone(),
            CheckSigPolicy::Stubbed,
        );
        assert_eq!(other.balance(), 0);
    }

    #[test]
    fn test_select_fewest_then_lowest() {
        let (wallet, _) = wallet_with(&[1, 5, 7, 10, 20]);

        let picked = |target| {
            let mut v: Vec<u64> = wallet
                .select_coins(target)
                .unwrap()
                .iter()
                .map(|c| c.1)
                .collect();
            v.sort();
            v
        };
        assert_eq!(picked(6), vec![7]);
        assert_eq!(picked(20), vec![20]);
        assert_eq!(picked(21), vec![1, 20]);
        assert_eq!(picked(26), vec![7, 20]);
        assert_eq!(picked(43), vec![1, 5, 7, 10, 20]);
        assert!(wallet.select_coins(44).is_none());
    }

    #[test]
    fn test_transfer_with_change() {
        let (mut wallet, _) = wallet_with(&[300, 250]);
        let recipient = Keypair::generate().public_key;
        let me = wallet.public_key();

        let tx = wallet.transfer(&recipient, 100, &me, 1).unwrap();
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs[0], TxOutput::new(100, script::pay_to_pubkey(&recipient)));
        assert_eq!(tx.outputs[1], TxOutput::new(149, script::pay_to_pubkey(&me)));

        // The 250 coin is reserved until the next sync.
        let tx = wallet.transfer(&recipient, 200, &me, 1).unwrap();
        assert_eq!(tx.outputs[1].value, 99);
        assert!(matches!(
            wallet.transfer(&recipient, 1, &me, 1),
            Err(WalletError::InsufficientFunds { available: 0, .. })
        ));
    }

    #[test]
    fn test_transfer_requires_empty_staging() {
        let (mut wallet, _) = wallet_with(&[300]);
        wallet.stage_output(1, "OP_1").unwrap();
        let me = wallet.public_key();
        assert_eq!(
            wallet.transfer(&me, 1, &me, 0),
            Err(WalletError::StagingInProgress)
        );
    }
}
