//! Parameter-driven state machine for gameplay logic (animation states, AI
//! modes).
//!
//! Parameters are declared up front and referenced through typed handles, so
//! a condition can never name a parameter that does not exist or compare it
//! against the wrong type.
//!
//! ```
//! use vela_engine::state_machine::{Condition, StateMachine, Transition};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Anim { Idle, Run, Jump }
//!
//! let mut sm = StateMachine::new(Anim::Idle);
//! let speed = sm.add_float(0.0);
//! let jump = sm.add_trigger();
//! sm.add_transition(Transition::new(Anim::Idle, Anim::Run).when(Condition::FloatGreater(speed, 0.1)));
//! sm.add_transition(Transition::any(Anim::Jump).when(Condition::Trigger(jump)));
//!
//! sm.set_float(speed, 3.0);
//! assert_eq!(sm.update(), Some((Anim::Idle, Anim::Run)));
//! sm.fire(jump);
//! assert_eq!(sm.update(), Some((Anim::Run, Anim::Jump)));
//! ```

/// Handle to a boolean parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolParam(usize);

/// Handle to a float parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatParam(usize);

/// Handle to an integer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntParam(usize);

/// Handle to a trigger: a boolean that is cleared by every `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerParam(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Bool(BoolParam, bool),
    FloatGreater(FloatParam, f64),
    FloatLess(FloatParam, f64),
    IntEquals(IntParam, i64),
    Trigger(TriggerParam),
}

#[derive(Debug, Clone)]
pub struct Transition<S> {
    /// `None` matches any current state.
    from: Option<S>,
    to: S,
    conditions: Vec<Condition>,
    allow_self: bool,
}

impl<S> Transition<S> {
    pub fn new(from: S, to: S) -> Self {
        Self {
            from: Some(from),
            to,
            conditions: Vec::new(),
            allow_self: false,
        }
    }

    /// A transition taken from whatever the current state is.
    pub fn any(to: S) -> Self {
        Self {
            from: None,
            to,
            conditions: Vec::new(),
            allow_self: false,
        }
    }

    /// Add a condition. All conditions must hold.
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Allow the transition to fire when already in the target state.
    pub fn allow_self(mut self) -> Self {
        self.allow_self = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct StateMachine<S> {
    current: S,
    bools: Vec<bool>,
    floats: Vec<f64>,
    ints: Vec<i64>,
    triggers: Vec<bool>,
    transitions: Vec<Transition<S>>,
}

impl<S: Copy + PartialEq + std::fmt::Debug> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            bools: Vec::new(),
            floats: Vec::new(),
            ints: Vec::new(),
            triggers: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn add_bool(&mut self, initial: bool) -> BoolParam {
        self.bools.push(initial);
        BoolParam(self.bools.len() - 1)
    }

    pub fn add_float(&mut self, initial: f64) -> FloatParam {
        self.floats.push(initial);
        FloatParam(self.floats.len() - 1)
    }

    pub fn add_int(&mut self, initial: i64) -> IntParam {
        self.ints.push(initial);
        IntParam(self.ints.len() - 1)
    }

    pub fn add_trigger(&mut self) -> TriggerParam {
        self.triggers.push(false);
        TriggerParam(self.triggers.len() - 1)
    }

    // Handles are indices into this machine's tables. A handle minted by
    // another machine may be out of range: setters ignore it, getters return
    // `None` and a condition naming it never holds.

    pub fn set_bool(&mut self, param: BoolParam, value: bool) {
        if let Some(slot) = self.bools.get_mut(param.0) {
            *slot = value;
        }
    }

    pub fn set_float(&mut self, param: FloatParam, value: f64) {
        if let Some(slot) = self.floats.get_mut(param.0) {
            *slot = value;
        }
    }

    pub fn set_int(&mut self, param: IntParam, value: i64) {
        if let Some(slot) = self.ints.get_mut(param.0) {
            *slot = value;
        }
    }

    /// Arm a trigger until the next [`update`](Self::update).
    pub fn fire(&mut self, param: TriggerParam) {
        if let Some(slot) = self.triggers.get_mut(param.0) {
            *slot = true;
        }
    }

    pub fn bool(&self, param: BoolParam) -> Option<bool> {
        self.bools.get(param.0).copied()
    }

    pub fn float(&self, param: FloatParam) -> Option<f64> {
        self.floats.get(param.0).copied()
    }

    pub fn int(&self, param: IntParam) -> Option<i64> {
        self.ints.get(param.0).copied()
    }

    pub fn is_fired(&self, param: TriggerParam) -> bool {
        self.triggers.get(param.0).copied().unwrap_or(false)
    }

    /// Reset every trigger without evaluating transitions.
    pub fn reset_triggers(&mut self) {
        self.triggers.iter_mut().for_each(|t| *t = false);
    }

    pub fn add_transition(&mut self, transition: Transition<S>) {
        self.transitions.push(transition);
    }

    /// Force the current state.
    pub fn set_state(&mut self, state: S) {
        self.current = state;
    }

    fn holds(&self, condition: &Condition) -> bool {
        match *condition {
            Condition::Bool(p, expected) => self.bool(p) == Some(expected),
            Condition::FloatGreater(p, threshold) => self.float(p).is_some_and(|v| v > threshold),
            Condition::FloatLess(p, threshold) => self.float(p).is_some_and(|v| v < threshold),
            Condition::IntEquals(p, expected) => self.int(p) == Some(expected),
            Condition::Trigger(p) => self.is_fired(p),
        }
    }

    /// Take the first eligible transition in declaration order, if any.
    ///
    /// Returns `(from, to)` when a transition fired. Every trigger is cleared
    /// afterwards, whether it was used or not.
    pub fn update(&mut self) -> Option<(S, S)> {
        let current = self.current;
        let fired = self
            .transitions
            .iter()
            .filter(|t| t.from.map_or(true, |from| from == current))
            .filter(|t| t.allow_self || t.to != current)
            .find(|t| t.conditions.iter().all(|c| self.holds(c)))
            .map(|t| t.to);

        self.reset_triggers();

        let to = fired?;
        self.current = to;
        tracing::trace!(from = ?current, ?to, "state transition");
        Some((current, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Patrol,
        Chase,
        Attack,
    }

    #[test]
    fn no_transition_without_conditions_met() {
        let mut sm = StateMachine::new(Mode::Patrol);
        let seen = sm.add_bool(false);
        sm.add_transition(Transition::new(Mode::Patrol, Mode::Chase).when(Condition::Bool(seen, true)));
        assert_eq!(sm.update(), None);
        assert_eq!(sm.current(), Mode::Patrol);
    }

    #[test]
    fn all_conditions_must_hold() {
        let mut sm = StateMachine::new(Mode::Chase);
        let dist = sm.add_float(10.0);
        let ammo = sm.add_int(0);
        sm.add_transition(
            Transition::new(Mode::Chase, Mode::Attack)
                .when(Condition::FloatLess(dist, 2.0))
                .when(Condition::IntEquals(ammo, 3)),
        );
        sm.set_float(dist, 1.0);
        assert_eq!(sm.update(), None);
        sm.set_int(ammo, 3);
        assert_eq!(sm.update(), Some((Mode::Chase, Mode::Attack)));
    }

    #[test]
    fn only_one_transition_per_update() {
        let mut sm = StateMachine::new(Mode::Patrol);
        let go = sm.add_bool(true);
        sm.add_transition(Transition::new(Mode::Patrol, Mode::Chase).when(Condition::Bool(go, true)));
        sm.add_transition(Transition::new(Mode::Chase, Mode::Attack).when(Condition::Bool(go, true)));
        assert_eq!(sm.update(), Some((Mode::Patrol, Mode::Chase)));
        assert_eq!(sm.update(), Some((Mode::Chase, Mode::Attack)));
    }

    #[test]
    fn declaration_order_wins() {
        let mut sm = StateMachine::new(Mode::Patrol);
        sm.add_transition(Transition::new(Mode::Patrol, Mode::Attack));
        sm.add_transition(Transition::new(Mode::Patrol, Mode::Chase));
        assert_eq!(sm.update(), Some((Mode::Patrol, Mode::Attack)));
    }

    #[test]
    fn unused_triggers_are_reset() {
        let mut sm = StateMachine::new(Mode::Patrol);
        let alarm = sm.add_trigger();
        let other = sm.add_trigger();
        sm.add_transition(Transition::new(Mode::Chase, Mode::Attack).when(Condition::Trigger(alarm)));
        sm.fire(alarm);
        sm.fire(other);
        assert_eq!(sm.update(), None);
        assert!(!sm.is_fired(alarm));
        assert!(!sm.is_fired(other));

        sm.set_state(Mode::Chase);
        assert_eq!(sm.update(), None, "trigger must not survive the previous update");
    }

    #[test]
    fn any_state_ignores_self_unless_allowed() {
        let mut sm = StateMachine::new(Mode::Attack);
        let hit = sm.add_trigger();
        sm.add_transition(Transition::any(Mode::Attack).when(Condition::Trigger(hit)));
        sm.fire(hit);
        assert_eq!(sm.update(), None);

        let mut sm = StateMachine::new(Mode::Attack);
        let hit = sm.add_trigger();
        sm.add_transition(Transition::any(Mode::Attack).when(Condition::Trigger(hit)).allow_self());
        sm.fire(hit);
        assert_eq!(sm.update(), Some((Mode::Attack, Mode::Attack)));
    }

    #[test]
    fn foreign_handles_never_hold() {
        let mut other = StateMachine::new(Mode::Patrol);
        other.add_bool(false);
        let foreign_flag = other.add_bool(true);
        let foreign_alarm = other.add_trigger();

        let mut sm = StateMachine::new(Mode::Patrol);
        sm.add_transition(Transition::new(Mode::Patrol, Mode::Chase).when(Condition::Bool(foreign_flag, true)));
        sm.add_transition(Transition::any(Mode::Attack).when(Condition::Trigger(foreign_alarm)));

        sm.set_bool(foreign_flag, true);
        sm.fire(foreign_alarm);
        assert_eq!(sm.bool(foreign_flag), None);
        assert!(!sm.is_fired(foreign_alarm));
        assert_eq!(sm.update(), None);
        assert_eq!(sm.current(), Mode::Patrol);
    }
}
