//! multiverse-explorer: browse the Rick & Morty catalog, generate AI
//! dialogues, search semantically, keep notes and hear scripts narrated.

pub mod app;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod models;
pub mod narrator;
pub mod notes;
pub mod shell;
pub mod speech;
pub mod view;
