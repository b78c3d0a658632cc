//! Built-in migration handlers

pub mod build_script;
pub mod cartridge_dependency;
pub mod examine_dependencies;
pub mod move_files;
pub mod remove_assembly;
pub mod remove_dependency;
pub mod remove_files;
pub mod rename_dependency;
pub mod rename_packages;
pub mod site_content;
pub mod update_build;
pub mod version_files;

pub use cartridge_dependency::ConvertToCartridgeDependency;
pub use examine_dependencies::ExamineCartridgeDependencies;
pub use move_files::{MoveArtifacts, MoveFiles, MoveFilteredFolder, MoveFolder};
pub use remove_assembly::RemoveAssembly;
pub use remove_dependency::RemoveDependency;
pub use remove_files::RemoveFiles;
pub use rename_dependency::RenameDependency;
pub use rename_packages::RenamePackages;
pub use site_content::AddSiteContentPreparer;
pub use update_build::UpdateGradleBuild;
pub use version_files::MigrateVersionFiles;

use crate::handler::{HandlerRegistry, MigrationHandler};

fn boxed<H: MigrationHandler + Default + 'static>() -> Box<dyn MigrationHandler> {
    Box::new(H::default())
}

/// Register every built-in handler under its name and older aliases
pub fn register_all(registry: &mut HandlerRegistry) {
    registry.register_with_aliases("RenameDependency", &["RenamedDependency"], boxed::<RenameDependency>);
    registry.register_with_aliases("RemoveDependency", &["RemovedDependency"], boxed::<RemoveDependency>);
    registry.register("ConvertToCartridgeDependency", boxed::<ConvertToCartridgeDependency>);
    registry.register_with_aliases("UpdateGradleBuild", &["UpdateGradleBuild7to10"], boxed::<UpdateGradleBuild>);
    registry.register("AddSiteContentPreparer", boxed::<AddSiteContentPreparer>);
    registry.register_with_aliases("RenamePackages", &["RenamedPackages"], boxed::<RenamePackages>);
    registry.register("MoveFiles", boxed::<MoveFiles>);
    registry.register("MoveFolder", boxed::<MoveFolder>);
    registry.register("MoveFilteredFolder", boxed::<MoveFilteredFolder>);
    registry.register("MoveArtifacts", boxed::<MoveArtifacts>);
    registry.register("RemoveAssembly", boxed::<RemoveAssembly>);
    registry.register("RemoveFiles", boxed::<RemoveFiles>);
    registry.register("MigrateVersionFiles", boxed::<MigrateVersionFiles>);
    registry.register("ExamineCartridgeDependencies", boxed::<ExamineCartridgeDependencies>);
}
