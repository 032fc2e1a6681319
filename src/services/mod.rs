pub mod access;
pub mod consolidation_service;
pub mod import_report;
pub mod lookup;
pub mod order_import_service;
pub mod order_service;
pub mod order_views;
pub mod paging;
pub mod reference_import_service;

pub use access::*;
pub use consolidation_service::*;
pub use import_report::*;
pub use order_import_service::*;
pub use order_service::*;
pub use order_views::*;
pub use paging::*;
pub use reference_import_service::*;
