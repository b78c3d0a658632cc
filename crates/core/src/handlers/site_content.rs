//! Register the site-content preparer for units that ship a `sites` folder

use crate::handler::{MigrationHandler, ProjectUnit};
use crate::properties::{GroupType, PropertyFile};
use crate::report::{MigrationReport, OperationKind};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const SITE_CONTENT_PREPARER: &str = "com.intershop.site.dbinit.SiteContentPreparer";

const PREPARER_COMMENT: &str = "# Prepare sites-folder";
const RESOURCES_DIR: &str = "src/main/resources/resources/{cartridgeName}";
const LEGACY_SITES_DIR: &str = "staticfiles/share/sites";
const LEGACY_DBINIT: &str = "staticfiles/cartridge/dbinit.properties";
const DBINIT: &str = "dbinit.properties";

#[derive(Debug, Default)]
pub struct AddSiteContentPreparer;

impl AddSiteContentPreparer {
    /// The unit's `sites` folder, at the legacy or the new location
    fn sites_folder(unit: &ProjectUnit) -> Option<PathBuf> {
        [
            unit.resolve(LEGACY_SITES_DIR),
            unit.resolve(RESOURCES_DIR).join("sites"),
        ]
        .into_iter()
        .find(|dir| dir.is_dir())
    }

    /// Existing `dbinit.properties`, new location first
    fn dbinit_properties(unit: &ProjectUnit) -> Option<PathBuf> {
        [unit.resolve(RESOURCES_DIR).join(DBINIT), unit.resolve(LEGACY_DBINIT)]
            .into_iter()
            .find(|file| file.is_file())
    }

    /// Add the preparer to `file`; `false` when it is already registered
    pub fn inject(file: &mut PropertyFile) -> bool {
        if file.contains(SITE_CONTENT_PREPARER) {
            return false;
        }
        file.insert_entry(
            GroupType::Pre,
            SITE_CONTENT_PREPARER,
            vec![PREPARER_COMMENT.to_string()],
        )
        .is_some()
    }
}

impl MigrationHandler for AddSiteContentPreparer {
    fn migrate(&mut self, unit: &ProjectUnit, report: &MigrationReport) -> Result<()> {
        let Some(sites) = Self::sites_folder(unit) else {
            debug!(unit = %unit.name, "no sites folder");
            return Ok(());
        };
        debug!(unit = %unit.name, sites = %sites.display(), "sites folder found");

        let path = match Self::dbinit_properties(unit) {
            Some(path) => path,
            None => {
                let path = unit.resolve(RESOURCES_DIR).join(DBINIT);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create '{}'", parent.display()))?;
                }
                fs::write(&path, "").with_context(|| format!("Failed to create '{}'", path.display()))?;
                report.record_success(&unit.name, OperationKind::Create, &path, &path);
                path
            }
        };

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read '{}'", path.display()))?;
        let mut properties = PropertyFile::parse_str(&content);
        if !Self::inject(&mut properties) {
            debug!(unit = %unit.name, file = %path.display(), "site content preparer already registered");
            return Ok(());
        }

        fs::write(&path, properties.render())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        report.record_success(&unit.name, OperationKind::Modify, &path, &path);
        Ok(())
    }
}
