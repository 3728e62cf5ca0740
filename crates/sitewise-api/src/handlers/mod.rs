mod dashboard;
mod health;
mod projects;
mod query;
mod sessions;

pub use dashboard::get_dashboard;
pub use health::{health_check, readiness};
pub use projects::{
    archive_project, bulk_delete_projects, delete_project, export_project, find_duplicates,
    get_project, import_project, list_projects, merge_projects, projects_geojson, rename_project,
    search_projects, unarchive_project,
};
pub use query::handle_query;
pub use sessions::delete_session;
