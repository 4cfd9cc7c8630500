//! Decoding of the raffle program's `Raffle` account and the coordinator's
//! request counter from raw account data.

use anyhow::{Context, Result, bail, ensure};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

/// Byte offset of `request_counter` in the coordinator config account
/// (discriminator, admin, authority, fee_per_word, max_num_words).
pub const COORDINATOR_REQUEST_COUNTER_OFFSET: usize = 84;

/// Phase of the current round as stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Open,
    Calculating,
}

/// Off-chain view of the `Raffle` account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleSnapshot {
    pub entrance_fee: u64,
    pub interval: i64,
    pub coordinator_program: Pubkey,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub callback_compute_limit: u32,
    pub phase: Phase,
    pub last_timestamp: i64,
    pub recent_winner: Pubkey,
    pub pending_request_id: u64,
    pub round: u64,
    pub bump: u8,
    pub vault_bump: u8,
    pub participants: Vec<Pubkey>,
}

/// Compute the Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{name}").as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Sequential little-endian reader over Borsh-encoded account data.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .with_context(|| format!("account data truncated at offset {}", self.pos))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn pubkey(&mut self) -> Result<Pubkey> {
        Ok(Pubkey::new_from_array(self.take()?))
    }
}

impl RaffleSnapshot {
    /// Decode a `Raffle` account, discriminator included.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let disc: [u8; 8] = reader.take()?;
        ensure!(
            disc == account_discriminator("Raffle"),
            "account is not a Raffle (discriminator mismatch)"
        );

        let entrance_fee = reader.u64()?;
        let interval = reader.i64()?;
        let coordinator_program = reader.pubkey()?;
        let key_hash = reader.take()?;
        let subscription_id = reader.u64()?;
        let callback_compute_limit = reader.u32()?;
        let phase = match reader.u8()? {
            0 => Phase::Open,
            1 => Phase::Calculating,
            other => bail!("unknown raffle state variant {other}"),
        };
        let last_timestamp = reader.i64()?;
        let recent_winner = reader.pubkey()?;
        let pending_request_id = reader.u64()?;
        let round = reader.u64()?;
        let bump = reader.u8()?;
        let vault_bump = reader.u8()?;

        let count = reader.u32()? as usize;
        let participants = (0..count)
            .map(|_| reader.pubkey())
            .collect::<Result<Vec<_>>>()
            .context("participant list truncated")?;

        Ok(Self {
            entrance_fee,
            interval,
            coordinator_program,
            key_hash,
            subscription_id,
            callback_compute_limit,
            phase,
            last_timestamp,
            recent_winner,
            pending_request_id,
            round,
            bump,
            vault_bump,
            participants,
        })
    }
}

/// Read the next request id from the coordinator config account data.
pub fn coordinator_request_counter(data: &[u8]) -> Result<u64> {
    let end = COORDINATOR_REQUEST_COUNTER_OFFSET + 8;
    let bytes = data
        .get(COORDINATOR_REQUEST_COUNTER_OFFSET..end)
        .context("coordinator config data too short")?;
    let mut counter = [0u8; 8];
    counter.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(counter))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a snapshot the way the on-chain account lays it out.
    pub(crate) fn encode(snapshot: &RaffleSnapshot) -> Vec<u8> {
        let mut data = account_discriminator("Raffle").to_vec();
        data.extend_from_slice(&snapshot.entrance_fee.to_le_bytes());
        data.extend_from_slice(&snapshot.interval.to_le_bytes());
        data.extend_from_slice(snapshot.coordinator_program.as_ref());
        data.extend_from_slice(&snapshot.key_hash);
        data.extend_from_slice(&snapshot.subscription_id.to_le_bytes());
        data.extend_from_slice(&snapshot.callback_compute_limit.to_le_bytes());
        data.push(match snapshot.phase {
            Phase::Open => 0,
            Phase::Calculating => 1,
        });
        data.extend_from_slice(&snapshot.last_timestamp.to_le_bytes());
        data.extend_from_slice(snapshot.recent_winner.as_ref());
        data.extend_from_slice(&snapshot.pending_request_id.to_le_bytes());
        data.extend_from_slice(&snapshot.round.to_le_bytes());
        data.push(snapshot.bump);
        data.push(snapshot.vault_bump);
        data.extend_from_slice(&(snapshot.participants.len() as u32).to_le_bytes());
        for participant in &snapshot.participants {
            data.extend_from_slice(participant.as_ref());
        }
        data
    }

    pub(crate) fn sample(phase: Phase, participants: Vec<Pubkey>) -> RaffleSnapshot {
        RaffleSnapshot {
            entrance_fee: 10_000_000,
            interval: 30,
            coordinator_program: Pubkey::new_unique(),
            key_hash: [4u8; 32],
            subscription_id: 2,
            callback_compute_limit: 200_000,
            phase,
            last_timestamp: 1_700_000_000,
            recent_winner: Pubkey::default(),
            pending_request_id: 11,
            round: 3,
            bump: 254,
            vault_bump: 253,
            participants,
        }
    }

    #[test]
    fn decodes_calculating_raffle() {
        let snapshot = sample(
            Phase::Calculating,
            vec![Pubkey::new_unique(), Pubkey::new_unique()],
        );
        let decoded = RaffleSnapshot::decode(&encode(&snapshot)).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn trailing_capacity_is_ignored() {
        let snapshot = sample(Phase::Open, vec![]);
        let mut data = encode(&snapshot);
        // Allocated space for the full participant list stays zeroed.
        data.resize(data.len() + 32 * 250, 0);
        assert_eq!(RaffleSnapshot::decode(&data).unwrap(), snapshot);
    }

    #[test]
    fn rejects_foreign_account() {
        let mut data = encode(&sample(Phase::Open, vec![]));
        data[..8].copy_from_slice(&account_discriminator("CoordinatorConfig"));
        assert!(RaffleSnapshot::decode(&data).is_err());
    }

    #[test]
    fn rejects_truncated_participants() {
        let mut data = encode(&sample(Phase::Open, vec![Pubkey::new_unique()]));
        data.truncate(data.len() - 1);
        assert!(RaffleSnapshot::decode(&data).is_err());
    }

    #[test]
    fn rejects_unknown_phase() {
        let mut data = encode(&sample(Phase::Open, vec![]));
        // 8 disc + 8 + 8 + 32 + 32 + 8 + 4
        data[100] = 7;
        assert!(RaffleSnapshot::decode(&data).is_err());
    }

    #[test]
    fn reads_request_counter() {
        let mut data = vec![0u8; 101];
        data[84..92].copy_from_slice(&9u64.to_le_bytes());
        assert_eq!(coordinator_request_counter(&data).unwrap(), 9);
        assert!(coordinator_request_counter(&data[..90]).is_err());
    }
}
