//! Property tests over accounting identities and the query engine.
