/*!
# PS Dashboard

A browser-based analytics dashboard for payment-system click data, built in Rust.

## Overview

A CSV export of click events (one row per click, with conversion flag, paid
amount and revenue) is loaded once at startup, aggregated per day and
category, and explored through a single page: a date range, multi-select
PS ID and country filters, four KPI figures, a clicks-over-time chart and a
pair of switchable charts (pie or bar).

## Architecture

### Data Layer
- **Loader** - Validates the required columns and parses every row into a typed record
- **Raw Store** - Immutable record set, also the source of the filter options
- **Aggregate Table** - Per (date, ps_id, country, card brand, payment method, gender)
  sums of clicks, conversions, paid amount and revenue

### Query Layer
- **Filter Engine** - Half-open date range plus PS ID and country sets
- **View Builders** - KPIs, clicks by date, shares and sums by category

### Web Layer (feature `web`)
- **Charts** - Server-side PNG rendering with plotters
- **Exports** - Filtered rows as CSV or XLSX
- **Auth** - HTTP Basic against a static, Argon2-hashed allow-list
- **App** - axum routes, request logging and the handlebars page

## Modules

- **record**: Record type, raw store and dashboard options
- **loader**: CSV import and row validation
- **table**: Aggregation into the table every view reads from
- **filter**: Filter spec and row selection
- **views**: KPI and chart data builders
- **config**: TOML configuration
- **error**: Error type shared by all modules
- **graph**: Chart rendering
- **downloader**: Export functionality (CSV, XLSX)
- **auth**: Allow-list and authentication middleware
- **app**: Routing and middleware

## REST API Endpoints

- `/` - Dashboard page
- `/api/options` - Filter options and default selection
- `/api/dashboard` - KPIs and chart data for a selection
- `/api/chart/{name}` - One chart as PNG
- `/api/export/{csv|xlsx}` - Filtered rows as a download
*/

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod record;
pub mod table;
pub mod views;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod auth;
#[cfg(feature = "web")]
pub mod downloader;
#[cfg(feature = "web")]
pub mod graph;

/// Re-export the data and query layers to make them easier to use
pub use config::*;
pub use error::*;
pub use filter::*;
pub use loader::*;
pub use record::*;
pub use table::*;
pub use views::*;
