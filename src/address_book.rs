use anyhow::{bail, Context};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

const EMBEDDED_ADDRESS_BOOK: &str = include_str!("../data/address_book.csv");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookEntry {
    pub address: String,
    pub name: String,
    pub chain_id: u64,
}

/// Display names keyed by chain id, then by lowercased address.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: Vec<AddressBookEntry>,
    index: HashMap<u64, HashMap<String, String>>,
}

impl AddressBook {
    /// The dataset compiled into the binary.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_csv_str(EMBEDDED_ADDRESS_BOOK).context("Embedded address book is invalid")
    }

    /// Reads `path` when given, otherwise falls back to the embedded dataset.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open address book: {}", path.display()))?;
                Self::from_csv_reader(file)
                    .with_context(|| format!("Failed to parse address book: {}", path.display()))
            }
            None => Self::embedded(),
        }
    }

    pub fn from_csv_str(csv: &str) -> anyhow::Result<Self> {
        Self::from_csv_reader(csv.as_bytes())
    }

    /// Parses `address,name,chainId` rows.
    ///
    /// Incomplete rows and rows with a non-numeric chain id are skipped. When the
    /// same address appears twice on one chain the first name wins.
    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().context("Failed to read CSV headers")?;
        if !headers
            .iter()
            .any(|h| h.to_ascii_lowercase().contains("address"))
        {
            bail!("CSV must start with: address,name,chainId");
        }

        let mut entries = Vec::new();
        for (i, rec) in reader.records().enumerate() {
            let record = rec.with_context(|| format!("Failed to read CSV record {}", i + 1))?;
            let (Some(address), Some(name), Some(chain_raw)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                continue;
            };
            if address.is_empty() || name.is_empty() || chain_raw.is_empty() {
                continue;
            }
            let Ok(chain_id) = chain_raw.parse::<u64>() else {
                tracing::warn!("Skipping address book row {}: bad chainId {}", i + 1, chain_raw);
                continue;
            };
            entries.push(AddressBookEntry {
                address: address.to_string(),
                name: name.to_string(),
                chain_id,
            });
        }

        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AddressBookEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut index: HashMap<u64, HashMap<String, String>> = HashMap::new();

        for entry in entries {
            let key = (entry.address.to_lowercase(), entry.chain_id);
            if !seen.insert(key.clone()) {
                continue;
            }
            index
                .entry(entry.chain_id)
                .or_default()
                .insert(key.0, entry.name.clone());
            kept.push(entry);
        }

        Self {
            entries: kept,
            index,
        }
    }

    /// Name for `address` on `chain_id`, matched case-insensitively.
    pub fn name_for(&self, chain_id: u64, address: &str) -> Option<&str> {
        self.index
            .get(&chain_id)?
            .get(&address.to_lowercase())
            .map(String::as_str)
    }

    pub fn entries(&self) -> &[AddressBookEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the deduplicated table back out as CSV.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["address", "name", "chainId"])?;
        for entry in &self.entries {
            writer.write_record([
                entry.address.as_str(),
                entry.name.as_str(),
                entry.chain_id.to_string().as_str(),
            ])?;
        }
        let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
        Ok(String::from_utf8(bytes)?)
    }
}
