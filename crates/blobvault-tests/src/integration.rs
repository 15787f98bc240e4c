//! End-to-end flows across engine, store, and catalog.
