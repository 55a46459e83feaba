// ┌───────────────────────────────────────────────────────────────────────┐
// │ Offset │ Length │ Description                                         │
// │────────┼────────┼─────────────────────────────────────────────────────│
// │   0    │   4    │ ID (u32, little-endian)                             │
// │   4    │  33    │ USERNAME (UTF-8, up to 32 bytes, zero-padded)       │
// │  37    │ 256    │ EMAIL    (UTF-8, up to 255 bytes, zero-padded)      │
// └───────────────────────────────────────────────────────────────────────┘

use std::fmt;

use crate::error::{DbError, DbResult};

pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;

pub const ID_SIZE: usize = 4;
pub const ID_OFFSET: usize = 0;
// Each text field reserves one byte past its column limit for the terminator.
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// One record of the table: `(id, username, email)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Build a row from raw statement values, rejecting anything that cannot be stored.
    pub fn new(id: i64, username: impl Into<String>, email: impl Into<String>) -> DbResult<Row> {
        if id < 0 {
            return Err(DbError::IdMustBePositive);
        }
        let id = u32::try_from(id).map_err(|_| DbError::IdTooLarge)?;
        let row = Row { id, username: username.into(), email: email.into() };
        row.validate()?;
        Ok(row)
    }

    /// Check that both text fields fit their fixed-width columns.
    pub fn validate(&self) -> DbResult<()> {
        if self.username.len() > COLUMN_USERNAME_SIZE || self.email.len() > COLUMN_EMAIL_SIZE {
            return Err(DbError::StringTooLong);
        }
        Ok(())
    }

    /// Write this row into `dest`, which must be at least `ROW_SIZE` bytes.
    /// Callers validate first; oversized text would otherwise be cut off.
    pub fn serialize(&self, dest: &mut [u8]) {
        let dest = &mut dest[..ROW_SIZE];
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_padded(&mut dest[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE], &self.username);
        write_padded(&mut dest[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE], &self.email);
    }

    pub fn deserialize(src: &[u8]) -> Row {
        let src = &src[..ROW_SIZE];
        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);
        Row {
            id: u32::from_le_bytes(id_bytes),
            username: read_padded(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]),
            email: read_padded(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn write_padded(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
    field[len..].fill(0);
}

fn read_padded(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
