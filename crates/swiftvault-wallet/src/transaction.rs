//! Client-side construction and signing of native transfers.
//!
//! Only the serialised, signed bytes leave the wallet. The layout is
//! the chain's legacy transaction format:
//!
//! ```text
//! transaction = compact(1) ‖ signature[64] ‖ message
//! message     = header[3] ‖ compact(n) ‖ keys[n][32] ‖ blockhash[32]
//!               ‖ compact(1) ‖ instruction
//! instruction = program_index ‖ compact(m) ‖ account_indices[m]
//!               ‖ compact(12) ‖ u32_le(2) ‖ u64_le(lamports)
//! ```
//!
//! Account keys are ordered signer first, then the recipient, then the
//! system program. A self-transfer lists the sender once.

use swiftvault_chain::Blockhash;
use swiftvault_crypto::signing::{Keypair, Signature};
use swiftvault_types::{PublicKey, Result, SwiftvaultError};

/// Lamports per whole native token.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Fractional digits of the native token.
pub const SOL_DECIMALS: usize = 9;

/// System program id (32 zero bytes).
pub const SYSTEM_PROGRAM_ID: PublicKey = PublicKey::from_bytes([0u8; 32]);

const SYSTEM_TRANSFER_TAG: u32 = 2;

// ---------------------------------------------------------------------------
// SignedTransaction
// ---------------------------------------------------------------------------

/// A signed transfer ready for submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedTransaction {
    message: Vec<u8>,
    signature: Signature,
}

impl SignedTransaction {
    /// The signed message bytes.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Fee-payer signature, also the transaction id once submitted.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Wire encoding: one signature followed by the message.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + Signature::LEN + self.message.len());
        encode_compact_u16(&mut out, 1);
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.message);
        out
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Builds and signs a transfer of `lamports` from `from` to `to`.
///
/// # Errors
///
/// [`SwiftvaultError::InvalidTransaction`] if `lamports` is zero.
pub fn build_transfer(
    from: &Keypair,
    to: &PublicKey,
    lamports: u64,
    recent_blockhash: &Blockhash,
) -> Result<SignedTransaction> {
    if lamports == 0 {
        return Err(SwiftvaultError::InvalidTransaction {
            reason: "transfer amount must be greater than zero".into(),
        });
    }

    let payer = from.public_key();
    let (keys, recipient_index): (Vec<PublicKey>, u8) = if *to == payer {
        (vec![payer, SYSTEM_PROGRAM_ID], 0)
    } else {
        (vec![payer, *to, SYSTEM_PROGRAM_ID], 1)
    };
    let program_index = (keys.len() - 1) as u8;

    let mut message = Vec::with_capacity(3 + 1 + keys.len() * 32 + 32 + 1 + 1 + 1 + 2 + 1 + 12);

    // 1 required signature, 0 read-only signed, 1 read-only unsigned (system program)
    message.extend_from_slice(&[1, 0, 1]);

    encode_compact_u16(&mut message, keys.len() as u16);
    for key in &keys {
        message.extend_from_slice(key.as_bytes());
    }
    message.extend_from_slice(recent_blockhash.as_bytes());

    encode_compact_u16(&mut message, 1);
    message.push(program_index);
    encode_compact_u16(&mut message, 2);
    message.extend_from_slice(&[0, recipient_index]);
    encode_compact_u16(&mut message, 12);
    message.extend_from_slice(&SYSTEM_TRANSFER_TAG.to_le_bytes());
    message.extend_from_slice(&lamports.to_le_bytes());

    let signature = from.sign(&message);
    Ok(SignedTransaction { message, signature })
}

/// Shortvec encoding: 7 bits per byte, low bits first, high bit set on
/// every byte but the last.
fn encode_compact_u16(out: &mut Vec<u8>, value: u16) {
    let mut rem = value;
    loop {
        let byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parses a decimal amount of native tokens (`"1.5"`, `"0.000000001"`,
/// `"42"`) into lamports.
///
/// # Errors
///
/// [`SwiftvaultError::InvalidTransaction`] for empty or non-decimal
/// input, more than nine fractional digits, or a value above `u64::MAX`
/// lamports.
pub fn parse_amount(input: &str) -> Result<u64> {
    let invalid = |reason: &str| SwiftvaultError::InvalidTransaction {
        reason: format!("invalid amount '{input}': {reason}"),
    };

    let s = input.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("empty"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a decimal number"));
    }
    if frac.len() > SOL_DECIMALS {
        return Err(invalid("more than 9 decimal places"));
    }

    let whole_lamports = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(LAMPORTS_PER_SOL))
            .ok_or_else(|| invalid("too large"))?
    };

    let frac_lamports = if frac.is_empty() {
        0
    } else {
        let digits: u64 = frac.parse().map_err(|_| invalid("expected a decimal number"))?;
        digits * 10u64.pow((SOL_DECIMALS - frac.len()) as u32)
    };

    whole_lamports
        .checked_add(frac_lamports)
        .ok_or_else(|| invalid("too large"))
}

/// Formats lamports as a decimal token amount without trailing zeros.
pub fn format_lamports(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:09}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiftvault_crypto::signing::verify;

    fn compact(value: u16) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_u16(&mut out, value);
        out
    }

    #[test]
    fn compact_u16_known_encodings() {
        assert_eq!(compact(0), [0x00]);
        assert_eq!(compact(0x7f), [0x7f]);
        assert_eq!(compact(0x80), [0x80, 0x01]);
        assert_eq!(compact(0x3fff), [0xff, 0x7f]);
        assert_eq!(compact(0x4000), [0x80, 0x80, 0x01]);
        assert_eq!(compact(u16::MAX), [0xff, 0xff, 0x03]);
    }

    #[test]
    fn transfer_layout() -> std::result::Result<(), SwiftvaultError> {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let to = PublicKey::from_bytes([9u8; 32]);
        let hash = Blockhash::from_bytes([7u8; 32]);
        let tx = build_transfer(&kp, &to, 1_500_000_000, &hash)?;
        let msg = tx.message();

        assert_eq!(&msg[..4], &[1, 0, 1, 3]);
        assert_eq!(&msg[4..36], kp.public_key().as_bytes());
        assert_eq!(&msg[36..68], to.as_bytes());
        assert_eq!(&msg[68..100], &[0u8; 32]);
        assert_eq!(&msg[100..132], hash.as_bytes());
        // one instruction: program 2, accounts [0, 1], 12 data bytes
        assert_eq!(&msg[132..138], &[1, 2, 2, 0, 1, 12]);
        assert_eq!(&msg[138..142], &2u32.to_le_bytes());
        assert_eq!(&msg[142..], &1_500_000_000u64.to_le_bytes());

        verify(&kp.public_key(), msg, tx.signature())?;

        let wire = tx.serialize();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], tx.signature().as_bytes());
        assert_eq!(&wire[65..], msg);
        Ok(())
    }

    #[test]
    fn self_transfer_lists_sender_once() -> std::result::Result<(), SwiftvaultError> {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let tx = build_transfer(&kp, &kp.public_key(), 1, &Blockhash::from_bytes([0u8; 32]))?;
        let msg = tx.message();
        assert_eq!(msg[3], 2);
        // after header, 2 keys and the blockhash
        assert_eq!(&msg[100..106], &[1, 1, 2, 0, 0, 12]);
        Ok(())
    }

    #[test]
    fn zero_transfer_rejected() {
        let kp = Keypair::from_seed(&[3u8; 32]);
        let result = build_transfer(&kp, &PublicKey::from_bytes([1; 32]), 0, &Blockhash::from_bytes([0; 32]));
        assert!(matches!(result, Err(SwiftvaultError::InvalidTransaction { .. })));
    }

    #[test]
    fn parse_amount_accepts_decimal_forms() -> std::result::Result<(), SwiftvaultError> {
        assert_eq!(parse_amount("1")?, 1_000_000_000);
        assert_eq!(parse_amount("1.5")?, 1_500_000_000);
        assert_eq!(parse_amount("0.000000001")?, 1);
        assert_eq!(parse_amount(".25")?, 250_000_000);
        assert_eq!(parse_amount("2.")?, 2_000_000_000);
        assert_eq!(parse_amount(" 18446744073.709551615 ")?, u64::MAX);
        Ok(())
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        for bad in ["", ".", "abc", "-1", "1e9", "1.2.3", "0.0000000001", "18446744073.709551616", "99999999999999999999"] {
            assert!(
                matches!(parse_amount(bad), Err(SwiftvaultError::InvalidTransaction { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn format_lamports_trims_zeros() {
        assert_eq!(format_lamports(0), "0");
        assert_eq!(format_lamports(1_500_000_000), "1.5");
        assert_eq!(format_lamports(1), "0.000000001");
    }
}
