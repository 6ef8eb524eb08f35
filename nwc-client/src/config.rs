// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::time::Duration;

use nwc_core::Method;

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);
pub const SHORT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INFO_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadlines for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Until at least one relay acknowledges the request.
    pub publish: Duration,
    /// Until the reply arrives, measured from when the request was built.
    pub reply: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            publish: DEFAULT_PUBLISH_TIMEOUT,
            reply: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub publish_timeout: Duration,
    pub reply_timeout: Duration,
    pub method_reply_timeouts: HashMap<Method, Duration>,
    pub info_fetch_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let method_reply_timeouts = [
            Method::GetInfo,
            Method::GetBalance,
            Method::GetBudget,
            Method::ListTransactions,
        ]
        .into_iter()
        .map(|m| (m, SHORT_REPLY_TIMEOUT))
        .collect();

        Self {
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            method_reply_timeouts,
            info_fetch_timeout: DEFAULT_INFO_FETCH_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_method_reply_timeout(mut self, method: Method, timeout: Duration) -> Self {
        self.method_reply_timeouts.insert(method, timeout);
        self
    }

    pub fn with_info_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.info_fetch_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn timeouts_for(&self, method: &Method) -> Timeouts {
        Timeouts {
            publish: self.publish_timeout,
            reply: self
                .method_reply_timeouts
                .get(method)
                .copied()
                .unwrap_or(self.reply_timeout),
        }
    }
}
