use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

use parking_lot::Mutex;
use port_policy_core::{parse_listing, PolicyMap, PortRange, Protocol};
use selinux_ports::runner::{CommandOutput, CommandRunner};

/// In-memory `semanage port` with a fixed default policy and a mutable local store.
pub struct FakeSemanage {
    state: Mutex<State>,
}

struct State {
    default_listing: String,
    defined_by_default: BTreeSet<PortRange>,
    local: PolicyMap,
    calls: Vec<Vec<String>>,
    fail_flag: Option<String>,
}

impl FakeSemanage {
    pub fn new(default_listing: &str, local: &[(&str, &str)]) -> Self {
        let defined_by_default = parse_listing(default_listing, None)
            .expect("default listing parses")
            .ranges()
            .copied()
            .collect();
        let local = local
            .iter()
            .map(|(range, label)| (range.parse::<PortRange>().expect("valid range"), *label))
            .collect();
        Self {
            state: Mutex::new(State {
                default_listing: default_listing.to_string(),
                defined_by_default,
                local,
                calls: Vec::new(),
                fail_flag: None,
            }),
        }
    }

    /// Make every later call carrying `flag` exit with status 1.
    pub fn fail_on(&self, flag: &str) {
        self.state.lock().fail_flag = Some(flag.to_string());
    }

    pub fn local(&self) -> PolicyMap {
        self.state.lock().local.clone()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().calls.clone()
    }

    /// Add, modify and delete invocations, oldest first.
    pub fn mutations(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|args| !args.iter().any(|arg| arg == "--list"))
            .collect()
    }

    pub fn listed_full_policy(&self) -> bool {
        self.calls().iter().any(|args| {
            args.iter().any(|arg| arg == "--list") && !args.iter().any(|arg| arg == "--locallist")
        })
    }
}

impl CommandRunner for FakeSemanage {
    fn run(&self, _program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let mut state = self.state.lock();
        state.calls.push(args.to_vec());
        if let Some(flag) = &state.fail_flag {
            if args.contains(flag) {
                return Ok(failed(1, "ValueError: injected failure"));
            }
        }

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["port", "--noheading", "--list", "--locallist"] => Ok(succeeded(render(&state.local))),
            ["port", "--noheading", "--list"] => {
                let listing = format!("{}{}", state.default_listing, render(&state.local));
                Ok(succeeded(listing))
            }
            ["port", flag, "-t", label, "-p", protocol, ports] => {
                let Ok(protocol) = protocol.parse::<Protocol>() else {
                    return Ok(failed(1, "ValueError: unknown protocol"));
                };
                let Ok(range) = PortRange::parse_spec(ports, protocol) else {
                    return Ok(failed(1, "ValueError: invalid port"));
                };
                let in_default = state.defined_by_default.contains(&range);
                match *flag {
                    "-a" if in_default || state.local.contains(&range) => Ok(failed(
                        1,
                        &format!("ValueError: Port {protocol}/{ports} already defined"),
                    )),
                    "-a" => {
                        state.local.insert(range, *label);
                        Ok(succeeded(String::new()))
                    }
                    "-m" if !in_default && !state.local.contains(&range) => Ok(failed(
                        1,
                        &format!("ValueError: Port {protocol}/{ports} is not defined"),
                    )),
                    "-m" => {
                        state.local.insert(range, *label);
                        Ok(succeeded(String::new()))
                    }
                    "-d" if state.local.remove(&range).is_none() => Ok(failed(
                        1,
                        &format!("ValueError: Port {protocol}/{ports} is not defined"),
                    )),
                    "-d" => Ok(succeeded(String::new())),
                    _ => Ok(failed(2, "usage: semanage port")),
                }
            }
            _ => Ok(failed(2, "usage: semanage port")),
        }
    }
}

/// Group entries the way semanage does: one line per type and protocol.
fn render(policy: &PolicyMap) -> String {
    let mut grouped: BTreeMap<(&str, Protocol), Vec<String>> = BTreeMap::new();
    for (range, label) in policy.iter() {
        grouped
            .entry((label, range.protocol()))
            .or_default()
            .push(range.port_spec());
    }
    grouped
        .into_iter()
        .map(|((label, protocol), specs)| {
            format!("{label:<27} {:<14} {}\n", protocol.as_str(), specs.join(", "))
        })
        .collect()
}

fn succeeded(stdout: String) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: stdout.into_bytes(),
        stderr: Vec::new(),
    }
}

fn failed(status: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        status: Some(status),
        stdout: Vec::new(),
        stderr: format!("{stderr}\n").into_bytes(),
    }
}
