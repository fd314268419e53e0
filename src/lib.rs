//! tvsift: a terminal table viewer built around a client side
//! search / filter / sort / highlight engine (see [`search`]).

pub mod controller;
pub mod domain;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod search;
pub mod ui;
