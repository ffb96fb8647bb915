//! PipeHub: a VFX pipeline dashboard backend.
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `config`   | Environment-driven configuration                     |
//! | `errors`   | Typed error hierarchy (auth and tickets)             |
//! | `models`   | Ticket domain types and statistics                   |
//! | `store`    | `TicketRepository` contract, async handle, in-memory |
//! | `db`       | SQLite-backed repository                             |
//! | `auth`     | Discord OAuth2 gateway                               |
//! | `archive`  | Read-only markdown ticket archive                    |
//! | `bot`      | Discord notifier and its supervised task             |
//! | `pipeline` | Render queue / farm health / milestone snapshots     |
//! | `api`      | HTTP handlers and router                             |
//! | `server`   | Router assembly, static assets, lifecycle            |

pub mod api;
pub mod archive;
pub mod auth;
pub mod bot;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod store;
