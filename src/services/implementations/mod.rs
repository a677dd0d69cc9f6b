pub mod fanout_service;
pub mod store_service;
pub mod sweeper_service;
pub mod webserver_service;

pub use fanout_service::FanoutService;
pub use store_service::StoreService;
pub use sweeper_service::SweeperService;
pub use webserver_service::WebserverService;
