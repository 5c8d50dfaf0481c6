// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Vainu Recon Library
 * Concurrent web reconnaissance and vulnerability discovery engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
pub mod config;
pub mod errors;
pub mod http_client;
pub mod observer;
pub mod types;

// Fingerprint signature DSL: rule model, boolean expressions, matcher
pub mod fingerprint;

// Two-phase scanner pipeline: passive observation + active path probing
pub mod webscan;

// Template-driven vulnerability checking
pub mod nuclei;
