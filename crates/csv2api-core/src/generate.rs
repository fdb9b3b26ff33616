//! Random sample input for load and smoke testing.

use std::collections::BTreeMap;
use std::io::Write;

use crate::contract::{EntityContract, EntityKind};
use crate::{CoreError, ValidationError};

/// Upper bound on generated rows: the size of a 24-bit MAC suffix space.
pub const MAX_GENERATED: u64 = 16_777_215;

const DEFAULT_ROLE_ID: &str = "3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Mac,
    Username,
    Password,
    RoleId,
    VisitorName,
}

impl Column {
    const fn name(self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Username => "username",
            Self::Password => "password",
            Self::RoleId => "role_id",
            Self::VisitorName => "visitor_name",
        }
    }
}

/// Writes `count` synthetic records for one entity type as CSV.
///
/// Devices get sequential MAC addresses under a random 24-bit prefix; guests
/// get `<prefix>_<index>` usernames with the reversed username as password.
/// Extra fields are appended as constant columns and replace any generated
/// column of the same name other than the key.
#[derive(Debug)]
pub struct Generator {
    contract: &'static EntityContract,
    extra: BTreeMap<String, String>,
    rng: fastrand::Rng,
}

impl Generator {
    pub fn new(contract: &'static EntityContract, extra: &BTreeMap<String, String>) -> Self {
        let extra = extra
            .iter()
            .filter(|(key, _)| key.as_str() != contract.key_field)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            contract,
            extra,
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic output for a given seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    fn columns(&self) -> Vec<Column> {
        let base: &[Column] = match self.contract.kind {
            EntityKind::Device => &[Column::Mac, Column::RoleId, Column::VisitorName],
            EntityKind::Guest => &[
                Column::Username,
                Column::Password,
                Column::RoleId,
                Column::VisitorName,
            ],
        };
        base.iter()
            .copied()
            .filter(|column| !self.extra.contains_key(column.name()))
            .collect()
    }

    pub fn write<W: Write>(&mut self, count: u64, out: W) -> Result<(), CoreError> {
        if count == 0 || count > MAX_GENERATED {
            return Err(ValidationError::InvalidCount {
                value: count,
                max: MAX_GENERATED,
            }
            .into());
        }

        let prefix = u64::from(self.rng.u32(..MAX_GENERATED as u32));
        let columns = self.columns();
        let mut writer = csv::Writer::from_writer(out);

        let header = columns
            .iter()
            .map(|column| column.name())
            .chain(self.extra.keys().map(String::as_str));
        writer.write_record(header)?;

        for index in 0..count {
            let row = columns
                .iter()
                .map(|column| self.cell(*column, prefix, index))
                .chain(self.extra.values().cloned())
                .collect::<Vec<_>>();
            writer.write_record(&row)?;
        }

        writer.flush().map_err(csv::Error::from)?;
        tracing::debug!(entity = %self.contract.kind, count, prefix, "generated sample input");
        Ok(())
    }

    fn cell(&self, column: Column, prefix: u64, index: u64) -> String {
        match column {
            Column::Mac => format_mac((prefix << 24) + index),
            Column::Username => username(prefix, index),
            Column::Password => username(prefix, index).chars().rev().collect(),
            Column::RoleId => String::from(DEFAULT_ROLE_ID),
            Column::VisitorName => {
                let label = match self.contract.kind {
                    EntityKind::Device => "Device",
                    EntityKind::Guest => "Visitor",
                };
                format!("{label} {prefix:X} and {index}")
            }
        }
    }
}

fn username(prefix: u64, index: u64) -> String {
    format!("{prefix}_{index:06}")
}

/// Upper-case, dash-separated 48-bit MAC address.
fn format_mac(value: u64) -> String {
    let hex = format!("{:012X}", value & 0xFFFF_FFFF_FFFF);
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}
