//! Script binary tag and the standard pay-to-public-key scripts.
//!
//! Scripts travel on transactions as source text. The spending program is
//! the unlock script followed by the lock script of the referenced output.

use crate::crypto::{Keypair, PublicKey};
use crate::transaction::OutPoint;

/// Three-byte tag that prefixes every assembled script binary.
pub const MAGIC: &[u8; 3] = b"BTC";

/// Lock script that is satisfied by a signature from `owner`.
pub fn pay_to_pubkey(owner: &PublicKey) -> String {
    format!("OP_DUP \"{}\" OP_EQUALVERIFY OP_CHECKSIG", owner.to_hex())
}

/// Unlock script spending `outpoint` under a [`pay_to_pubkey`] lock.
pub fn unlock_pubkey(keypair: &Keypair, outpoint: &OutPoint) -> String {
    let signature = keypair.sign_hash(&outpoint.spend_message());
    format!(
        "\"{}\" \"{}\"",
        signature.to_hex(),
        keypair.public_key.to_hex()
    )
}

/// Join an unlock and a lock script into one program.
///
/// A newline separates them so a trailing comment in the unlock script ends
/// before the lock script starts.
pub fn spending_program(unlock: &str, lock: &str) -> String {
    format!("{}\n{}", unlock, lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    #[test]
    fn test_pay_to_pubkey_embeds_key() {
        let kp = Keypair::generate();
        let lock = pay_to_pubkey(&kp.public_key);
        assert!(lock.starts_with("OP_DUP \""));
        assert!(lock.contains(&kp.public_key.to_hex()));
        assert!(lock.ends_with("OP_CHECKSIG"));
    }

    #[test]
    fn test_unlock_carries_signature_and_key() {
        let kp = Keypair::generate();
        let point = OutPoint::new(sha256(b"tx"), 0);
        let unlock = unlock_pubkey(&kp, &point);
        let parts: Vec<&str> = unlock.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 128 + 2);
        assert_eq!(parts[1], format!("\"{}\"", kp.public_key.to_hex()));
    }

    #[test]
    fn test_spending_program_separates_comment() {
        let program = spending_program("OP_1 # note", "OP_VERIFY");
        assert_eq!(program, "OP_1 # note\nOP_VERIFY");
    }
}
