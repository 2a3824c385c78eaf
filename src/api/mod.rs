pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::MEMBER_ID_HEADER;
pub use routes::create_api_router;
