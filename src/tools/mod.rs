//! Tools - One-shot wallet flows behind the `restore-from-seed` and `backup-to-seed` binaries

mod backup;
mod restore;

pub use backup::{backup_to_seed, BackupOptions, BackupReport, BACKUP_PREFIX};
pub use restore::{
    prepare_restore, restore_from_seed, DownloadProgress, RestoreOptions, RESTORE_CREATION_TIME, RESTORE_MNEMONIC,
    RESTORE_PREFIX,
};
