//! Candy machine program plumbing: addresses, account derivation and raw
//! instruction building.
//!
//! The candy machine is an anchor program, so instruction data starts with
//! the 8-byte discriminator `sha256("global:<name>")[..8]` and account data
//! with `sha256("account:<Name>")[..8]`; arguments follow in borsh layout.

pub mod resolver;
pub mod uploader;

use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program,
    sysvar,
};

use crate::error::{Error, Result};

pub const CANDY_MACHINE_PROGRAM_ID: Pubkey =
    pubkey!("cndyAnrLdpjq1Ssp1z8xxDsB8dxe7u4HL5Nxi2K5WXZ");
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey =
    pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

const CANDY_MACHINE_SEED: &[u8] = b"candy_machine";
const METADATA_SEED: &[u8] = b"metadata";
const EDITION_SEED: &[u8] = b"edition";

/// Candy machine UUIDs are the first six characters of the config address.
pub fn uuid_of(config_address: &str) -> String {
    config_address.chars().take(6).collect()
}

/// Anchor 8-byte instruction discriminator: `sha256("global:{name}")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

/// Anchor 8-byte account discriminator: `sha256("account:{name}")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = hash(format!("{}:{}", namespace, name).as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&digest.to_bytes()[..8]);
    disc
}

/// Derive the candy machine PDA from its config account and uuid.
pub fn derive_candy_machine(config: &Pubkey, uuid: &str) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[CANDY_MACHINE_SEED, config.as_ref(), uuid.as_bytes()],
        &CANDY_MACHINE_PROGRAM_ID,
    )
}

/// Derive the token metadata PDA for a mint.
pub fn derive_metadata(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_SEED, TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Derive the master edition PDA for a mint.
pub fn derive_master_edition(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            METADATA_SEED,
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
            EDITION_SEED,
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Minimal decoded snapshot of a candy machine account.
///
/// Enough to prove the account is real and to address the mint transaction;
/// reproducing the full on-chain layout is deliberately not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandyState {
    pub authority: Pubkey,
    /// Treasury wallet that receives mint payments.
    pub wallet: Pubkey,
    pub data_len: usize,
}

impl CandyState {
    /// Validate raw account data as a candy machine and pull out the fields
    /// we need. Failure here means the probed candidate was not a candy
    /// machine after all.
    pub fn try_from_account_data(data: &[u8]) -> Result<Self> {
        if data.len() < 72 {
            return Err(Error::Chain(format!(
                "account data too short for a candy machine ({} bytes)",
                data.len()
            )));
        }
        if data[..8] != account_discriminator("CandyMachine") {
            return Err(Error::Chain("account discriminator mismatch".into()));
        }
        let authority = Pubkey::try_from(&data[8..40])
            .map_err(|_| Error::Chain("bad authority field".into()))?;
        let wallet = Pubkey::try_from(&data[40..72])
            .map_err(|_| Error::Chain("bad wallet field".into()))?;
        Ok(Self {
            authority,
            wallet,
            data_len: data.len(),
        })
    }
}

/// One metadata config line in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub name: String,
    pub uri: String,
}

fn encode_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Build an `add_config_lines` instruction for one batch.
///
/// `index` is the absolute line offset the batch starts at; it anchors the
/// batch to its logical position regardless of completion order.
pub fn add_config_lines_instruction(
    config: &Pubkey,
    authority: &Pubkey,
    index: u32,
    lines: &[ConfigLine],
) -> Instruction {
    let mut data = instruction_discriminator("add_config_lines").to_vec();
    data.extend_from_slice(&index.to_le_bytes());
    data.extend_from_slice(&(lines.len() as u32).to_le_bytes());
    for line in lines {
        encode_string(&mut data, &line.name);
        encode_string(&mut data, &line.uri);
    }
    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*config, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// Build the `initialize_candy_machine` instruction.
pub fn initialize_candy_machine_instruction(
    bump: u8,
    uuid: &str,
    price_lamports: u64,
    items_available: u64,
    candy_machine: &Pubkey,
    wallet: &Pubkey,
    config: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    let mut data = instruction_discriminator("initialize_candy_machine").to_vec();
    data.push(bump);
    encode_string(&mut data, uuid);
    data.extend_from_slice(&price_lamports.to_le_bytes());
    data.extend_from_slice(&items_available.to_le_bytes());
    // go_live_date: Option<i64> = None
    data.push(0);
    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*candy_machine, false),
            AccountMeta::new(*wallet, false),
            AccountMeta::new_readonly(*config, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

/// Build the `mint_nft` instruction for one freshly generated mint.
#[allow(clippy::too_many_arguments)]
pub fn mint_nft_instruction(
    config: &Pubkey,
    candy_machine: &Pubkey,
    payer: &Pubkey,
    candy_wallet: &Pubkey,
    mint: &Pubkey,
    metadata: &Pubkey,
    master_edition: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*config, false),
            AccountMeta::new(*candy_machine, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new(*candy_wallet, false),
            AccountMeta::new(*metadata, false),
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(*master_edition, false),
            AccountMeta::new_readonly(TOKEN_METADATA_PROGRAM_ID, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
        data: instruction_discriminator("mint_nft").to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_first_six_chars() {
        let address = "53kf3BvG4yWWDjvzjc2v8hkbSAu5QtcnttMoqcsY49xA";
        assert_eq!(uuid_of(address), "53kf3B");
        assert_eq!(uuid_of(address), address[..6].to_string());
    }

    #[test]
    fn discriminators_are_stable_and_distinct() {
        assert_eq!(
            instruction_discriminator("mint_nft"),
            instruction_discriminator("mint_nft")
        );
        assert_ne!(
            instruction_discriminator("mint_nft"),
            instruction_discriminator("add_config_lines")
        );
        assert_ne!(
            instruction_discriminator("CandyMachine"),
            account_discriminator("CandyMachine")
        );
    }

    #[test]
    fn candy_machine_derivation_is_deterministic() {
        let config = Pubkey::new_unique();
        let uuid = uuid_of(&config.to_string());
        let (a, bump_a) = derive_candy_machine(&config, &uuid);
        let (b, bump_b) = derive_candy_machine(&config, &uuid);
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
        assert_ne!(a, config);
    }

    #[test]
    fn candy_state_round_trip() {
        let authority = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let mut data = account_discriminator("CandyMachine").to_vec();
        data.extend_from_slice(authority.as_ref());
        data.extend_from_slice(wallet.as_ref());
        data.extend_from_slice(&[0u8; 41]);

        let state = CandyState::try_from_account_data(&data).unwrap();
        assert_eq!(state.authority, authority);
        assert_eq!(state.wallet, wallet);
        assert_eq!(state.data_len, data.len());
    }

    #[test]
    fn candy_state_rejects_wrong_discriminator() {
        let mut data = account_discriminator("NotACandyMachine").to_vec();
        data.extend_from_slice(&[0u8; 64]);
        assert!(CandyState::try_from_account_data(&data).is_err());
        assert!(CandyState::try_from_account_data(&[0u8; 8]).is_err());
    }

    #[test]
    fn add_config_lines_encodes_offset_and_lines() {
        let config = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let lines = vec![
            ConfigLine {
                name: "Egg #0".into(),
                uri: "https://example.org/nft/0.png".into(),
            },
            ConfigLine {
                name: "Egg #1".into(),
                uri: "https://example.org/nft/1.png".into(),
            },
        ];
        let ix = add_config_lines_instruction(&config, &authority, 20, &lines);

        assert_eq!(ix.program_id, CANDY_MACHINE_PROGRAM_ID);
        assert_eq!(ix.data[..8], instruction_discriminator("add_config_lines"));
        assert_eq!(u32::from_le_bytes(ix.data[8..12].try_into().unwrap()), 20);
        assert_eq!(u32::from_le_bytes(ix.data[12..16].try_into().unwrap()), 2);
        // First line name directly follows the vec length prefix.
        assert_eq!(u32::from_le_bytes(ix.data[16..20].try_into().unwrap()), 6);
        assert_eq!(ix.data[20..26], *b"Egg #0");
        assert!(ix.accounts[1].is_signer);
    }

    #[test]
    fn initialize_encodes_bump_uuid_and_price() {
        let config = Pubkey::new_unique();
        let uuid = uuid_of(&config.to_string());
        let (candy_machine, bump) = derive_candy_machine(&config, &uuid);
        let payer = Pubkey::new_unique();
        let ix = initialize_candy_machine_instruction(
            bump,
            &uuid,
            1_500_000_000,
            333,
            &candy_machine,
            &payer,
            &config,
            &payer,
        );
        assert_eq!(ix.data[8], bump);
        assert_eq!(u32::from_le_bytes(ix.data[9..13].try_into().unwrap()), 6);
        assert_eq!(ix.data[13..19], *uuid.as_bytes());
        assert_eq!(
            u64::from_le_bytes(ix.data[19..27].try_into().unwrap()),
            1_500_000_000
        );
        assert_eq!(u64::from_le_bytes(ix.data[27..35].try_into().unwrap()), 333);
        assert_eq!(ix.data[35], 0); // go_live_date: None
    }

    #[test]
    fn mint_nft_instruction_shape() {
        let config = Pubkey::new_unique();
        let (candy_machine, _) = derive_candy_machine(&config, "abc123");
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = mint_nft_instruction(
            &config,
            &candy_machine,
            &payer,
            &Pubkey::new_unique(),
            &mint,
            &derive_metadata(&mint),
            &derive_master_edition(&mint),
        );
        assert_eq!(ix.data, instruction_discriminator("mint_nft").to_vec());
        assert_eq!(ix.accounts.len(), 14);
        // Payer signs as payer, mint authority and update authority.
        assert_eq!(ix.accounts.iter().filter(|a| a.is_signer).count(), 3);
    }
}
