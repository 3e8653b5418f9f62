pub mod profile_response;
