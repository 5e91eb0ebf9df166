//! Admissions Lead Intake API Library
//!
//! Receives the marketing site's contact form and records each lead in the CRM:
//! validate, create or merge the contact, then tag it, annotate it and open a
//! conversation for the sales team.
//!
//! # Modules
//!
//! - `api`: HTTP surface.
//! - `core`: Submission workflow, validation and shared types.
//! - `integrations`: CRM client.
//! - `app`: Router construction and middleware.
//! - `config`: Configuration management.
//! - `crm_client`: CRM REST client primitives.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Inbound, outbound and CRM data models.
//! - `pipeline`: Submission orchestration.
//! - `resolution`: Create-or-merge of CRM contacts.
//! - `validation`: Contact form validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod app;
pub mod config;
pub mod crm_client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod resolution;
pub mod validation;
