//! Device selection tests against a scripted runtime

mod scripted_runtime;
