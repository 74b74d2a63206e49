//! Property tests entry point; modules live in property/.

mod property;
