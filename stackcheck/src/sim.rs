//! In-memory simulated window manager.
//!
//! `SimWindowManager` is the deterministic twin of a real manager behind
//! the channel seams: same traits, no display server. Mutations that
//! trigger restacking are queued and applied only after a seeded-random
//! number of signal polls, so the convergence waiter is exercised exactly
//! as it would be against a live compositor, deterministically per seed.
//!
//! The stacking policy models the behavior under test: activating any
//! member of a transiency chain raises the whole chain above its root
//! application, transients above their owners, the desktop staying below
//! every visible client. Transiency edges may pass through a momentary
//! cycle between commands; restacking resolves whatever the edges say once
//! the queue drains.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{CommandChannel, QueryChannel, WindowKind};
use crate::error::{HarnessError, HarnessResult};
use crate::registry::{WindowHandle, WindowRole};
use crate::snapshot::{SnapshotScope, StackEntry, StackSnapshot, StackingSignal, Visibility};

/// How the simulated manager stacks a raised transiency chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaisePolicy {
    /// Correct behavior: every transient above its owner.
    TransientsAboveOwners,
    /// Deliberately broken behavior for negative tests: owners end up on
    /// top of their transients.
    OwnersAboveTransients,
}

#[derive(Debug, Clone)]
struct SimWindow {
    handle: WindowHandle,
    role: WindowRole,
    parent: Option<WindowHandle>,
}

#[derive(Debug, Clone)]
enum SimOp {
    Iconify(WindowHandle),
    Activate(WindowHandle),
    Restack,
}

#[derive(Debug)]
struct PendingRestack {
    op: SimOp,
    polls_left: u32,
}

/// Deterministic in-memory window manager.
pub struct SimWindowManager {
    rng: StdRng,
    next_id: u32,
    windows: Vec<SimWindow>,
    /// Chain roots by activation recency, least recent first.
    activation: Vec<WindowHandle>,
    /// Chain roots currently iconified.
    iconified: HashSet<WindowHandle>,
    /// Current stacking, bottom-to-top.
    stack: Vec<WindowHandle>,
    pending: VecDeque<PendingRestack>,
    signal_version: u64,
    desktop: WindowHandle,
    policy: RaisePolicy,
}

impl SimWindowManager {
    /// Create a manager with the correct raise policy.
    pub fn new(seed: u64) -> Self {
        Self::with_policy(seed, RaisePolicy::TransientsAboveOwners)
    }

    /// Create a manager with an explicit raise policy.
    pub fn with_policy(seed: u64, policy: RaisePolicy) -> Self {
        let desktop = WindowHandle::new("0x1a00001");
        let mut wm = Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 0x1a00002,
            windows: vec![SimWindow {
                handle: desktop.clone(),
                role: WindowRole::Desktop,
                parent: None,
            }],
            activation: Vec::new(),
            iconified: HashSet::new(),
            stack: Vec::new(),
            pending: VecDeque::new(),
            signal_version: 0,
            desktop,
            policy,
        };
        wm.recompute_stack();
        wm
    }

    fn window(&self, handle: &WindowHandle) -> Option<&SimWindow> {
        self.windows.iter().find(|w| &w.handle == handle)
    }

    fn known(&self, handle: &WindowHandle) -> HarnessResult<()> {
        if self.window(handle).is_some() {
            Ok(())
        } else {
            Err(HarnessError::Channel(format!("unknown window {handle}")))
        }
    }

    fn chain_root(&self, handle: &WindowHandle) -> WindowHandle {
        let mut visited = HashSet::new();
        let mut current = handle.clone();
        while visited.insert(current.clone()) {
            match self.window(&current).and_then(|w| w.parent.clone()) {
                Some(parent) if self.window(&parent).is_some() => current = parent,
                _ => break,
            }
        }
        current
    }

    fn chain(&self, root: &WindowHandle) -> Vec<WindowHandle> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_chain(root, &mut visited, &mut out);
        out
    }

    fn collect_chain(
        &self,
        handle: &WindowHandle,
        visited: &mut HashSet<WindowHandle>,
        out: &mut Vec<WindowHandle>,
    ) {
        if !visited.insert(handle.clone()) {
            return;
        }
        out.push(handle.clone());
        let children: Vec<WindowHandle> = self
            .windows
            .iter()
            .filter(|w| w.parent.as_ref() == Some(handle))
            .map(|w| w.handle.clone())
            .collect();
        for child in children {
            self.collect_chain(&child, visited, out);
        }
    }

    fn is_root(&self, handle: &WindowHandle) -> bool {
        *handle != self.desktop && self.chain_root(handle) == *handle
    }

    /// Rebuild the bottom-to-top stacking from activation order, edges,
    /// and iconified state.
    fn recompute_stack(&mut self) {
        let mut stack = Vec::new();
        let roots: Vec<WindowHandle> = self
            .activation
            .iter()
            .filter(|r| self.is_root(r))
            .cloned()
            .collect();
        // Iconified chains sink below the desktop.
        for root in roots.iter().filter(|r| self.iconified.contains(*r)) {
            stack.extend(self.stacked_chain(root));
        }
        stack.push(self.desktop.clone());
        for root in roots.iter().filter(|r| !self.iconified.contains(*r)) {
            stack.extend(self.stacked_chain(root));
        }
        self.stack = stack;
    }

    fn stacked_chain(&self, root: &WindowHandle) -> Vec<WindowHandle> {
        let mut chain = self.chain(root);
        if self.policy == RaisePolicy::OwnersAboveTransients {
            chain.reverse();
        }
        chain
    }

    fn queue(&mut self, op: SimOp) {
        let polls_left = self.rng.gen_range(1..=3);
        self.pending.push_back(PendingRestack { op, polls_left });
    }

    /// Advance pending work by one signal poll. When the front entry's
    /// latency expires the whole queue is applied as one batched restack,
    /// mirroring a manager that coalesces restacking work.
    fn tick(&mut self) {
        let expired = match self.pending.front_mut() {
            Some(front) => {
                front.polls_left -= 1;
                front.polls_left == 0
            }
            None => false,
        };
        if !expired {
            return;
        }
        while let Some(entry) = self.pending.pop_front() {
            self.apply(entry.op);
        }
    }

    fn apply(&mut self, op: SimOp) {
        match op {
            SimOp::Iconify(handle) => {
                let root = self.chain_root(&handle);
                self.iconified.insert(root);
            }
            SimOp::Activate(handle) => {
                let root = self.chain_root(&handle);
                self.iconified.remove(&root);
                self.activation.retain(|r| *r != root);
                self.activation.push(root);
            }
            SimOp::Restack => {}
        }
        self.recompute_stack();
        self.signal_version += 1;
    }
}

#[async_trait(?Send)]
impl CommandChannel for SimWindowManager {
    async fn create_window(
        &mut self,
        kind: WindowKind,
        transient_to: Option<&WindowHandle>,
    ) -> HarnessResult<WindowHandle> {
        if let Some(parent) = transient_to {
            self.known(parent)?;
        }
        let handle = WindowHandle::new(format!("0x{:x}", self.next_id));
        self.next_id += 1;
        let role = match kind {
            WindowKind::Application => WindowRole::Application,
            WindowKind::Dialog => WindowRole::Dialog,
        };
        self.windows.push(SimWindow {
            handle: handle.clone(),
            role,
            parent: transient_to.cloned(),
        });
        self.activation.push(handle.clone());
        // Mapping a new window restacks immediately.
        self.recompute_stack();
        self.signal_version += 1;
        Ok(handle)
    }

    async fn iconify(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.known(window)?;
        self.queue(SimOp::Iconify(window.clone()));
        Ok(())
    }

    async fn activate(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.known(window)?;
        self.queue(SimOp::Activate(window.clone()));
        Ok(())
    }

    async fn set_transient_for(
        &mut self,
        window: &WindowHandle,
        new_parent: &WindowHandle,
    ) -> HarnessResult<()> {
        self.known(window)?;
        self.known(new_parent)?;
        // The property change lands immediately; the restack is async.
        if let Some(entry) = self.windows.iter_mut().find(|w| &w.handle == window) {
            entry.parent = Some(new_parent.clone());
        }
        self.queue(SimOp::Restack);
        Ok(())
    }

    async fn destroy_all(&mut self) -> HarnessResult<()> {
        self.windows.retain(|w| w.handle == self.desktop);
        self.activation.clear();
        self.iconified.clear();
        self.pending.clear();
        self.recompute_stack();
        self.signal_version += 1;
        Ok(())
    }
}

#[async_trait(?Send)]
impl QueryChannel for SimWindowManager {
    async fn stack_snapshot(&mut self, _scope: SnapshotScope) -> HarnessResult<StackSnapshot> {
        let entries = self
            .stack
            .iter()
            .rev()
            .map(|handle| {
                let window = self.window(handle).cloned();
                let iconic = self.iconified.contains(&self.chain_root(handle));
                StackEntry {
                    handle: handle.clone(),
                    visibility: if iconic {
                        Visibility::Iconic
                    } else {
                        Visibility::Viewable
                    },
                    role_hint: window.map(|w| w.role),
                }
            })
            .collect();
        Ok(StackSnapshot::from_entries(entries))
    }

    async fn stacking_signal(&mut self) -> HarnessResult<StackingSignal> {
        self.tick();
        Ok(StackingSignal::new(format!(
            "stacking:{}",
            self.signal_version
        )))
    }
}
