use crate::sizing::{derive_sizing, DerivedSizing, OffHeapRule};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_JAVA: &str = "java";
pub const DEFAULT_JAR_PATH: &str = "./target/oak-benchmarks-synchrobench-0.1.6-SNAPSHOT.jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchTarget {
    Oak,
    Baseline,
}

impl BenchTarget {
    pub fn class_name(self) -> &'static str {
        match self {
            BenchTarget::Oak => "com.oath.oak.OakMyBufferMap",
            BenchTarget::Baseline => "JavaSkipListMap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadParams {
    pub key_size: u32,
    pub value_size: u32,
    pub run_count: u32,
    pub duration_ms: u64,
    pub warmup: u32,
    pub update_ratio: Option<u32>,
    pub append_ratio: Option<u32>,
    pub snapshot: Option<u32>,
    pub buffer: bool,
}

impl WorkloadParams {
    pub const fn ingestion(duration_ms: u64) -> Self {
        Self {
            key_size: 100,
            value_size: 1000,
            run_count: 1,
            duration_ms,
            warmup: 0,
            update_ratio: None,
            append_ratio: None,
            snapshot: None,
            buffer: false,
        }
    }

    pub const fn scan_put(duration_ms: u64) -> Self {
        Self {
            key_size: 100,
            value_size: 1000,
            run_count: 1,
            duration_ms,
            warmup: 0,
            update_ratio: Some(5),
            append_ratio: Some(0),
            snapshot: Some(0),
            buffer: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub target: BenchTarget,
    pub data_size: u64,
    pub threads: u32,
    pub heap_gb: u64,
    pub offheap: OffHeapRule,
    pub workload: WorkloadParams,
}

impl Configuration {
    pub fn key_range(&self) -> u64 {
        self.data_size * 2
    }

    pub fn sizing(&self) -> DerivedSizing {
        derive_sizing(self.data_size, self.heap_gb, &self.offheap)
    }

    pub fn command_line(&self, java: &str, jar_path: &str) -> CommandLine {
        let sizing = self.sizing();
        let w = &self.workload;
        let mut cmd = format!(
            "{} -server -Xmx{}g -XX:MaxDirectMemorySize={}g -jar {} -b {} -k {} -v {} -i {} -r {} -n {} -t {} -d {} -W {}",
            java,
            sizing.onheap_gb,
            sizing.offheap_gb,
            jar_path,
            self.target.class_name(),
            w.key_size,
            w.value_size,
            self.data_size,
            self.key_range(),
            w.run_count,
            self.threads,
            w.duration_ms,
            w.warmup
        );
        if let Some(u) = w.update_ratio {
            cmd.push_str(&format!(" -u {}", u));
        }
        if let Some(a) = w.append_ratio {
            cmd.push_str(&format!(" -a {}", a));
        }
        if let Some(s) = w.snapshot {
            cmd.push_str(&format!(" -s {}", s));
        }
        if w.buffer {
            cmd.push_str(" --buffer");
        }
        CommandLine::split(&cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    // Single spaces only; a token cannot contain whitespace.
    pub fn split(command: &str) -> Self {
        Self {
            tokens: command.split(' ').map(str::to_string).collect(),
        }
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}
