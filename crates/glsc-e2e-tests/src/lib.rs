//! End-to-end tests for glsc live under `tests/`.
