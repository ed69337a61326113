//! LMDB-backed document store
//!
//! Layout:
//! - `principals`: principal id -> JSON document
//! - `roles`: role id -> JSON document
//! - `role_names`: role name -> role id (uniqueness index)
//! - `meta`: `schema_version` -> u64

use std::path::Path;

use byteorder::BigEndian;
use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entity::{Principal, Role};
use crate::entity_id::{PrincipalId, RoleId};
use crate::error::{err, Error, Result};
use crate::store::Store;

// Database type aliases
pub type DbDoc = Database<Str, Bytes>;
pub type DbName = Database<Str, Str>;
pub type DbMeta = Database<Str, U64<BigEndian>>;

/// Bumped whenever the document layout changes incompatibly
pub const SCHEMA_VERSION: u64 = 1;
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;
/// LMDB's default compiled-in key limit, in bytes
pub const MAX_KEY_SIZE: usize = 511;
const SCHEMA_KEY: &str = "schema_version";

/// All database handles
pub struct Dbs {
    pub principals: DbDoc,
    pub roles: DbDoc,
    pub role_names: DbName,
    pub meta: DbMeta,
}

/// Store backed by an LMDB environment on disk
pub struct LmdbStore {
    env: Env,
    dbs: Dbs,
}

/// LMDB rejects empty keys and keys over [`MAX_KEY_SIZE`]
#[inline]
fn storable(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_SIZE
}

fn unstorable(kind: &str, key: &str) -> Error {
    Error::Invalid(format!("{} must be 1 to {} bytes, got {}", kind, MAX_KEY_SIZE, key.len()))
}

fn encode<T: Serialize>(doc: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).map_err(err)
}

fn decode<T: DeserializeOwned>(bytes: Option<&[u8]>) -> Result<Option<T>> {
    bytes.map(|b| serde_json::from_slice(b).map_err(err)).transpose()
}

impl LmdbStore {
    /// Open (or create) a store in `path` with the default map size
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with(path: impl AsRef<Path>, map_size: usize) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(4)
                .open(path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            principals: env.create_database(&mut tx, Some("principals")).map_err(err)?,
            roles: env.create_database(&mut tx, Some("roles")).map_err(err)?,
            role_names: env.create_database(&mut tx, Some("role_names")).map_err(err)?,
            meta: env.create_database(&mut tx, Some("meta")).map_err(err)?,
        };
        match dbs.meta.get(&tx, SCHEMA_KEY).map_err(err)? {
            None => dbs.meta.put(&mut tx, SCHEMA_KEY, &SCHEMA_VERSION).map_err(err)?,
            Some(SCHEMA_VERSION) => {}
            Some(v) => {
                return Err(Error::Storage(format!(
                    "schema version {} at {} (expected {})",
                    v,
                    path.display(),
                    SCHEMA_VERSION
                )))
            }
        }
        tx.commit().map_err(err)?;
        tracing::debug!(path = %path.display(), "opened lmdb store");
        Ok(LmdbStore { env, dbs })
    }

    /// Execute a read-only operation
    #[inline]
    fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    /// Execute a write in its own transaction
    #[inline]
    fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(&self.dbs, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    pub fn schema_version(&self) -> Result<Option<u64>> {
        self.read(|d, tx| d.meta.get(tx, SCHEMA_KEY).map_err(err))
    }

    /// Clear all documents (for testing); the schema record is kept
    pub fn clear_all(&self) -> Result<()> {
        self.write(|d, tx| {
            d.principals.clear(tx).map_err(err)?;
            d.roles.clear(tx).map_err(err)?;
            d.role_names.clear(tx).map_err(err)
        })
    }
}

impl Store for LmdbStore {
    fn find_principal(&self, id: &PrincipalId) -> Result<Option<Principal>> {
        if !storable(id.as_str()) {
            return Ok(None);
        }
        self.read(|d, tx| decode(d.principals.get(tx, id.as_str()).map_err(err)?))
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        if !storable(principal.id.as_str()) {
            return Err(unstorable("principal id", principal.id.as_str()));
        }
        let doc = encode(principal)?;
        self.write(|d, tx| d.principals.put(tx, principal.id.as_str(), &doc).map_err(err))
    }

    fn find_role(&self, id: &RoleId) -> Result<Option<Role>> {
        if !storable(id.as_str()) {
            return Ok(None);
        }
        self.read(|d, tx| decode(d.roles.get(tx, id.as_str()).map_err(err)?))
    }

    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        if !storable(name) {
            return Ok(None);
        }
        self.read(|d, tx| match d.role_names.get(tx, name).map_err(err)? {
            Some(id) => decode(d.roles.get(tx, id).map_err(err)?),
            None => Ok(None),
        })
    }

    fn save_role(&self, role: &Role) -> Result<()> {
        if !storable(role.id.as_str()) {
            return Err(unstorable("role id", role.id.as_str()));
        }
        if !storable(&role.name) {
            return Err(unstorable("role name", &role.name));
        }
        let doc = encode(role)?;
        self.write(|d, tx| {
            let owner = d.role_names.get(tx, &role.name).map_err(err)?.map(str::to_string);
            if let Some(owner) = owner {
                if owner != role.id.as_str() {
                    return Err(Error::Conflict(format!("role name '{}' already taken", role.name)));
                }
            }
            let previous: Option<Role> = decode(d.roles.get(tx, role.id.as_str()).map_err(err)?)?;
            if let Some(prev) = previous {
                if prev.name != role.name {
                    d.role_names.delete(tx, &prev.name).map_err(err)?;
                }
            }
            d.roles.put(tx, role.id.as_str(), &doc).map_err(err)?;
            d.role_names.put(tx, &role.name, role.id.as_str()).map_err(err)
        })
    }

    fn delete_role(&self, id: &RoleId) -> Result<bool> {
        if !storable(id.as_str()) {
            return Ok(false);
        }
        self.write(|d, tx| {
            let existing: Option<Role> = decode(d.roles.get(tx, id.as_str()).map_err(err)?)?;
            match existing {
                Some(role) => {
                    d.role_names.delete(tx, &role.name).map_err(err)?;
                    d.roles.delete(tx, id.as_str()).map_err(err)
                }
                None => Ok(false),
            }
        })
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            // role_names iterates in name order
            for item in d.role_names.iter(tx).map_err(err)? {
                let (_, id) = item.map_err(err)?;
                if let Some(role) = decode(d.roles.get(tx, id).map_err(err)?)? {
                    r.push(role);
                }
            }
            Ok(r)
        })
    }
}
