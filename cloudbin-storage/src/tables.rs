// Copyright 2025 Cloudbin (https://github.com/cloudbin)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Table registry: backup modules, dependency DAG, dependency sort
//!
//! The module map and the parent table of each child are fixed data.
//! Everything the backup engine knows about ordering flows from here.

/// Named table groups an admin can back up independently
pub const BACKUP_MODULES: &[(&str, &[&str])] = &[
    ("text_management", &["pastes", "paste_passwords"]),
    ("file_management", &["files", "file_passwords"]),
    ("mount_management", &["storage_mounts"]),
    ("storage_config", &["storage_configs", "principal_storage_acl"]),
    ("key_management", &["api_keys"]),
    ("account_management", &["admins", "admin_tokens"]),
    ("system_settings", &["system_settings"]),
    ("fs_meta_management", &["fs_meta"]),
    (
        "task_management",
        &["tasks", "scheduled_jobs", "scheduled_job_runs"],
    ),
    ("upload_sessions", &["upload_sessions"]),
];

/// Module auto-inclusion: restoring a module pulls in what it references
pub const MODULE_DEPENDENCIES: &[(&str, &[&str])] = &[
    ("mount_management", &["storage_config"]),
    ("file_management", &["storage_config"]),
];

/// Child table -> parent tables it references
///
/// `tasks` references `api_keys` only for rows with `user_type='apikey'`;
/// the edge is kept unconditionally for ordering purposes.
pub const TABLE_PARENTS: &[(&str, &[&str])] = &[
    ("paste_passwords", &["pastes"]),
    ("file_passwords", &["files"]),
    ("admin_tokens", &["admins"]),
    ("storage_configs", &["admins"]),
    ("storage_mounts", &["storage_configs"]),
    ("tasks", &["api_keys"]),
    ("principal_storage_acl", &["api_keys", "storage_configs"]),
    ("scheduled_job_runs", &["scheduled_jobs"]),
    ("upload_sessions", &["storage_configs", "storage_mounts"]),
];

/// Derived FS search-index tables; rebuilt, never backed up
pub const FS_SEARCH_INDEX_TABLES: &[&str] = &[
    "fs_search_entries",
    "fs_search_state",
    "fs_search_dirty",
    "fs_search_fts",
];

/// Every backup-eligible table (the union of all modules)
pub fn all_backup_tables() -> Vec<String> {
    let mut out = Vec::new();
    for (_, tables) in BACKUP_MODULES {
        for table in *tables {
            if !out.iter().any(|t: &String| t == table) {
                out.push(table.to_string());
            }
        }
    }
    out
}

pub fn is_known_table(table: &str) -> bool {
    BACKUP_MODULES
        .iter()
        .any(|(_, tables)| tables.contains(&table))
}

pub fn is_known_module(module: &str) -> bool {
    BACKUP_MODULES.iter().any(|(name, _)| *name == module)
}

/// Tables of one module
pub fn module_tables(module: &str) -> Option<&'static [&'static str]> {
    BACKUP_MODULES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, tables)| *tables)
}

/// Parents of a table per the dependency DAG
pub fn table_parents(table: &str) -> &'static [&'static str] {
    TABLE_PARENTS
        .iter()
        .find(|(child, _)| *child == table)
        .map(|(_, parents)| *parents)
        .unwrap_or(&[])
}

/// Result of closing a module selection over [`MODULE_DEPENDENCIES`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExpansion {
    /// Selection plus everything pulled in, in stable order
    pub final_modules: Vec<String>,
    /// Only the modules that were pulled in
    pub auto_included: Vec<String>,
}

/// Expand a selection by the module-dependency map
pub fn expand_modules(selected: &[String]) -> ModuleExpansion {
    let mut final_modules: Vec<String> = Vec::new();
    let mut auto_included: Vec<String> = Vec::new();

    let mut queue: Vec<(String, bool)> = selected.iter().map(|m| (m.clone(), false)).collect();
    while let Some((module, was_pulled)) = queue.first().cloned() {
        queue.remove(0);
        if final_modules.contains(&module) {
            continue;
        }
        final_modules.push(module.clone());
        if was_pulled && !auto_included.contains(&module) {
            auto_included.push(module.clone());
        }
        if let Some((_, deps)) = MODULE_DEPENDENCIES.iter().find(|(name, _)| *name == module) {
            for dep in *deps {
                queue.push((dep.to_string(), true));
            }
        }
    }

    ModuleExpansion {
        final_modules,
        auto_included,
    }
}

/// Sort tables so that every parent precedes its children
///
/// Kahn-style over the working list: repeatedly take the first table whose
/// parents are already sorted or absent from the input set. A cycle cannot
/// happen with the static DAG above, but ill-formed input is tolerated by
/// appending the remainder in input order rather than crashing.
pub fn sort_tables_by_dependency(tables: &[String]) -> Vec<String> {
    let mut remaining: Vec<String> = tables.to_vec();
    let mut sorted: Vec<String> = Vec::with_capacity(tables.len());

    loop {
        let next = remaining.iter().position(|table| {
            table_parents(table).iter().all(|parent| {
                sorted.iter().any(|s| s == parent) || !remaining.iter().any(|r| r == parent)
            })
        });
        match next {
            Some(idx) => sorted.push(remaining.remove(idx)),
            None => {
                // Defensive fallback, not a guarantee
                sorted.extend(remaining.drain(..));
                break;
            }
        }
        if remaining.is_empty() {
            break;
        }
    }
    sorted
}
