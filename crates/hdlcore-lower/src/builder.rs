//! A library of standard-cell emitters used while lowering (spec §4.D).
//!
//! Every method here allocates fresh nets and appends gates/DFFs to the
//! netlist under construction; nothing is shared between calls except
//! through the two singleton constant nets. This is the load-bearing piece
//! for bit-identical reproducibility: n-ary reductions always pair elements
//! `0-1, 2-3, ...` before recursing (spec §4.D "ordering rules"), and carry
//! chains always run LSB → MSB.

use hdlcore::{Dff, Gate, NetId};

/// Accumulates gates, DFFs, and net allocations for one lowered design.
/// Call [`NetlistBuilder::finalize`] once every port and assignment has
/// been emitted.
pub struct NetlistBuilder {
    pub(crate) net_count: u32,
    pub(crate) gates: Vec<Gate>,
    pub(crate) dffs: Vec<Dff>,
    const_false: Option<NetId>,
    const_true: Option<NetId>,
}

impl Default for NetlistBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetlistBuilder {
    pub fn new() -> Self {
        Self {
            net_count: 0,
            gates: Vec::new(),
            dffs: Vec::new(),
            const_false: None,
            const_true: None,
        }
    }

    pub fn alloc_net(&mut self) -> NetId {
        let id = NetId::new(self.net_count);
        self.net_count += 1;
        id
    }

    pub fn alloc_bus(&mut self, width: u32) -> Vec<NetId> {
        (0..width).map(|_| self.alloc_net()).collect()
    }

    /// A shared constant-0 or constant-1 net; repeated calls return the
    /// same net rather than emitting a fresh `CONST` gate each time.
    pub fn const_net(&mut self, value: bool) -> NetId {
        let cached = if value { self.const_true } else { self.const_false };
        if let Some(net) = cached {
            return net;
        }
        let out = self.alloc_net();
        self.gates.push(Gate::Const { value, out });
        if value {
            self.const_true = Some(out);
        } else {
            self.const_false = Some(out);
        }
        out
    }

    pub fn const_bus(&mut self, width: u32, value: u64) -> Vec<NetId> {
        (0..width).map(|i| self.const_net((value >> i) & 1 != 0)).collect()
    }

    pub fn gate_and(&mut self, a: NetId, b: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::And { a, b, out });
        out
    }

    pub fn gate_or(&mut self, a: NetId, b: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::Or { a, b, out });
        out
    }

    pub fn gate_xor(&mut self, a: NetId, b: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::Xor { a, b, out });
        out
    }

    pub fn gate_not(&mut self, a: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::Not { a, out });
        out
    }

    pub fn gate_buf(&mut self, a: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::Buf { a, out });
        out
    }

    pub fn gate_mux(&mut self, sel: NetId, t: NetId, f: NetId) -> NetId {
        let out = self.alloc_net();
        self.gates.push(Gate::Mux { sel, t, f, out });
        out
    }

    pub fn gate_nand(&mut self, a: NetId, b: NetId) -> NetId {
        let and = self.gate_and(a, b);
        self.gate_not(and)
    }

    pub fn gate_nor(&mut self, a: NetId, b: NetId) -> NetId {
        let or = self.gate_or(a, b);
        self.gate_not(or)
    }

    pub fn gate_xnor(&mut self, a: NetId, b: NetId) -> NetId {
        let xor = self.gate_xor(a, b);
        self.gate_not(xor)
    }

    /// Drives `dst` directly from `src` via a `BUF` gate. Used when a
    /// value already computed in a fresh net must become the sole driver
    /// of a specific, previously-allocated net (e.g. a combinational
    /// assignment's target).
    pub fn drive(&mut self, src: NetId, dst: NetId) {
        self.gates.push(Gate::Buf { a: src, out: dst });
    }

    /// Balanced binary-tree reduction of `inputs` under a 2-input gate
    /// constructor, pairing `0-1, 2-3, ...` before recursing (spec §4.D).
    /// `inputs` must be non-empty.
    fn tree_reduce(&mut self, inputs: &[NetId], op: impl Fn(&mut Self, NetId, NetId) -> NetId + Copy) -> NetId {
        assert!(!inputs.is_empty(), "tree_reduce requires at least one input");
        if inputs.len() == 1 {
            return inputs[0];
        }
        let mut level: Vec<NetId> = inputs.to_vec();
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut i = 0;
            while i + 1 < level.len() {
                next.push(op(self, level[i], level[i + 1]));
                i += 2;
            }
            if i < level.len() {
                next.push(level[i]);
            }
            level = next;
        }
        level[0]
    }

    pub fn and_tree(&mut self, inputs: &[NetId]) -> NetId {
        self.tree_reduce(inputs, Self::gate_and)
    }

    pub fn or_tree(&mut self, inputs: &[NetId]) -> NetId {
        self.tree_reduce(inputs, Self::gate_or)
    }

    pub fn xor_tree(&mut self, inputs: &[NetId]) -> NetId {
        self.tree_reduce(inputs, Self::gate_xor)
    }

    fn zip_bus(&mut self, a: &[NetId], b: &[NetId], op: impl Fn(&mut Self, NetId, NetId) -> NetId) -> Vec<NetId> {
        let width = a.len().max(b.len());
        (0..width)
            .map(|i| {
                let av = a.get(i).copied().unwrap_or_else(|| self.const_net(false));
                let bv = b.get(i).copied().unwrap_or_else(|| self.const_net(false));
                op(self, av, bv)
            })
            .collect()
    }

    pub fn and_bus(&mut self, a: &[NetId], b: &[NetId]) -> Vec<NetId> {
        self.zip_bus(a, b, Self::gate_and)
    }

    pub fn or_bus(&mut self, a: &[NetId], b: &[NetId]) -> Vec<NetId> {
        self.zip_bus(a, b, Self::gate_or)
    }

    pub fn xor_bus(&mut self, a: &[NetId], b: &[NetId]) -> Vec<NetId> {
        self.zip_bus(a, b, Self::gate_xor)
    }

    pub fn not_bus(&mut self, a: &[NetId]) -> Vec<NetId> {
        a.iter().map(|&n| self.gate_not(n)).collect()
    }

    /// Per-bit 2:1 mux: `mux(sel, t, f)` bit by bit.
    pub fn mux_bus(&mut self, sel: NetId, t: &[NetId], f: &[NetId]) -> Vec<NetId> {
        let width = t.len().max(f.len());
        (0..width)
            .map(|i| {
                let tv = t.get(i).copied().unwrap_or_else(|| self.const_net(false));
                let fv = f.get(i).copied().unwrap_or_else(|| self.const_net(false));
                self.gate_mux(sel, tv, fv)
            })
            .collect()
    }

    /// Selects among `cases` (tested in order against `selector`, first
    /// match wins) with `default` as the fallback, as a tree of 2:1 muxes
    /// (spec §4.D "larger muxes → log-depth tree of 2:1 muxes").
    pub fn select_tree(&mut self, selector: &[NetId], cases: &[(u64, Vec<NetId>)], default: &[NetId]) -> Vec<NetId> {
        let mut result = default.to_vec();
        for (key, value) in cases.iter().rev() {
            let eq = self.equal_const(selector, *key);
            result = self.mux_bus(eq, value, &result);
        }
        result
    }

    pub fn equal_const(&mut self, bits: &[NetId], value: u64) -> NetId {
        let matches: Vec<NetId> = bits
            .iter()
            .enumerate()
            .map(|(i, &bit)| {
                let expected = (value >> i) & 1 != 0;
                if expected {
                    bit
                } else {
                    self.gate_not(bit)
                }
            })
            .collect();
        self.and_tree(&matches)
    }

    pub fn equal_bus(&mut self, a: &[NetId], b: &[NetId]) -> NetId {
        let xnors = self.zip_bus(a, b, Self::gate_xnor);
        self.and_tree(&xnors)
    }

    /// One full adder: returns `(sum, cout)`.
    pub fn full_adder(&mut self, a: NetId, b: NetId, cin: NetId) -> (NetId, NetId) {
        let ab = self.gate_xor(a, b);
        let sum = self.gate_xor(ab, cin);
        let ab_and = self.gate_and(a, b);
        let cin_and = self.gate_and(ab, cin);
        let cout = self.gate_or(ab_and, cin_and);
        (sum, cout)
    }

    /// Ripple-carry addition, LSB → MSB (spec §4.D "carry chains go LSB →
    /// MSB"). Returns `(sum, cout)`.
    pub fn ripple_adder(&mut self, a: &[NetId], b: &[NetId], cin: NetId) -> (Vec<NetId>, NetId) {
        let width = a.len().max(b.len());
        let mut sum = Vec::with_capacity(width);
        let mut carry = cin;
        for i in 0..width {
            let av = a.get(i).copied().unwrap_or_else(|| self.const_net(false));
            let bv = b.get(i).copied().unwrap_or_else(|| self.const_net(false));
            let (s, c) = self.full_adder(av, bv, carry);
            sum.push(s);
            carry = c;
        }
        (sum, carry)
    }

    /// Two's-complement subtraction (`a - b`) via inverted `b` and `cin=1`.
    /// Returns `(diff, borrow_out_complement)` where the second element is
    /// the adder's carry-out (1 means no borrow occurred).
    pub fn ripple_subtractor(&mut self, a: &[NetId], b: &[NetId]) -> (Vec<NetId>, NetId) {
        let not_b = self.not_bus(b);
        let one = self.const_net(true);
        self.ripple_adder(a, &not_b, one)
    }

    /// Adds `a + b + cin` and also returns the signed-overflow bit, per the
    /// spec §4.D formula `(a_msb XNOR b_msb) AND (sum_msb XOR a_msb)`.
    pub fn adder_with_overflow(
        &mut self,
        a: &[NetId],
        b: &[NetId],
        cin: NetId,
    ) -> (Vec<NetId>, NetId, NetId) {
        let (sum, cout) = self.ripple_adder(a, b, cin);
        let width = sum.len();
        let a_msb = a.get(width - 1).copied().unwrap_or_else(|| self.const_net(false));
        let b_msb = b.get(width - 1).copied().unwrap_or_else(|| self.const_net(false));
        let sum_msb = sum[width - 1];
        let same_sign = self.gate_xnor(a_msb, b_msb);
        let sum_differs = self.gate_xor(sum_msb, a_msb);
        let overflow = self.gate_and(same_sign, sum_differs);
        (sum, cout, overflow)
    }

    /// AND-ed partial products summed by a ripple tree (spec §4.D "array
    /// multiplier"). Result width is `a.len() + b.len()`.
    pub fn array_multiplier(&mut self, a: &[NetId], b: &[NetId]) -> Vec<NetId> {
        let width = a.len() + b.len();
        if a.is_empty() || b.is_empty() {
            return self.const_bus(width as u32, 0);
        }
        let zero = self.const_net(false);
        let mut acc = vec![zero; width];
        for (i, &bbit) in b.iter().enumerate() {
            let mut partial = vec![zero; width];
            for (j, &abit) in a.iter().enumerate() {
                partial[i + j] = self.gate_and(abit, bbit);
            }
            let (sum, _cout) = self.ripple_adder(&acc, &partial, zero);
            acc = sum;
        }
        acc
    }

    /// Restoring division (spec §4.D reference algorithm). Zero divisor
    /// yields an all-ones quotient and a remainder equal to the dividend,
    /// per spec §9 open question 1. Returns `(quotient, remainder)`, both
    /// the same width as `dividend`.
    pub fn restoring_divider(&mut self, dividend: &[NetId], divisor: &[NetId]) -> (Vec<NetId>, Vec<NetId>) {
        let width = dividend.len();
        let zero = self.const_net(false);
        let mut remainder = vec![zero; width];
        let mut quotient = vec![zero; width];
        let wide_divisor: Vec<NetId> = {
            let mut v = divisor.to_vec();
            v.resize(width, zero);
            v
        };

        for i in (0..width).rev() {
            // Shift remainder left by 1, bringing in dividend bit i.
            let mut shifted = vec![zero; width];
            shifted[0] = dividend[i];
            for k in 1..width {
                shifted[k] = remainder[k - 1];
            }
            remainder = shifted;

            let (diff, cout) = self.ripple_subtractor(&remainder, &wide_divisor);
            // cout = 1 means remainder >= divisor (no borrow).
            remainder = (0..width).map(|k| self.gate_mux(cout, diff[k], remainder[k])).collect();
            quotient[i] = cout;
        }
        (quotient, remainder)
    }

    /// Binary-tree decoder: `sel` (n bits) → `2^n` one-hot outputs.
    pub fn decoder(&mut self, sel: &[NetId]) -> Vec<NetId> {
        let count = 1usize << sel.len();
        (0..count as u64).map(|value| self.equal_const(sel, value)).collect()
    }

    /// Priority encoder: returns `(index, valid)` for the lowest-indexed
    /// asserted bit of `inputs`.
    pub fn priority_encoder(&mut self, inputs: &[NetId]) -> (Vec<NetId>, NetId) {
        if inputs.is_empty() {
            return (Vec::new(), self.const_net(false));
        }
        let index_width = (usize::BITS - (inputs.len() - 1).max(1).leading_zeros()).max(1);
        let valid = self.or_tree(inputs);

        // Build from the highest index down so lower indices take priority
        // (mux chain, first true input wins).
        let mut index = self.const_bus(index_width, 0);
        for i in (0..inputs.len()).rev() {
            let this_index = self.const_bus(index_width, i as u64);
            index = self.mux_bus(inputs[i], &this_index, &index);
        }
        (index, valid)
    }

    /// NOR-reduction: 1 iff every bit of `bits` is 0.
    pub fn zero_detect(&mut self, bits: &[NetId]) -> NetId {
        let any_set = self.or_tree(bits);
        self.gate_not(any_set)
    }

    /// Population count, log-width result.
    pub fn popcount(&mut self, bits: &[NetId]) -> Vec<NetId> {
        if bits.is_empty() {
            return vec![self.const_net(false)];
        }
        let result_width = (usize::BITS - bits.len().leading_zeros()).max(1);
        let zero = self.const_net(false);
        let mut acc = vec![zero; result_width as usize];
        for &bit in bits {
            let addend = {
                let mut v = vec![zero; result_width as usize];
                v[0] = bit;
                v
            };
            let (sum, _cout) = self.ripple_adder(&acc, &addend, zero);
            acc = sum;
        }
        acc
    }

    /// Leading-zero count (from the MSB down), log-width result.
    pub fn leading_zero_count(&mut self, bits: &[NetId]) -> Vec<NetId> {
        let width = bits.len();
        if width == 0 {
            return vec![self.const_net(false)];
        }
        let result_width = (usize::BITS - width.leading_zeros()).max(1);
        let zero = self.const_net(false);
        // seen_one[i] = true if any bit above position i (inclusive, scanning from MSB) was 1.
        let mut count = self.const_bus(result_width, width as u64);
        let mut any_seen = self.const_net(false);
        for i in (0..width).rev() {
            let is_set = bits[i];
            let first_one_here = self.gate_and(is_set, self.gate_not(any_seen));
            let leading = self.const_bus(result_width, (width - 1 - i) as u64);
            count = self.mux_bus(first_one_here, &leading, &count);
            any_seen = self.gate_or(any_seen, is_set);
        }
        count
    }

    pub fn sign_extend(&mut self, bits: &[NetId], width: u32) -> Vec<NetId> {
        let mut out = bits.to_vec();
        if bits.is_empty() {
            return self.const_bus(width, 0);
        }
        let msb = *bits.last().unwrap();
        while out.len() < width as usize {
            out.push(msb);
        }
        out.truncate(width as usize);
        out
    }

    pub fn zero_extend(&mut self, bits: &[NetId], width: u32) -> Vec<NetId> {
        let mut out = bits.to_vec();
        let zero = self.const_net(false);
        while out.len() < width as usize {
            out.push(zero);
        }
        out.truncate(width as usize);
        out
    }

    /// Log-depth barrel shifter. `amount` is LSB-first; only enough low
    /// bits of it select a stage, but any higher bit being set forces the
    /// result to all-fill rather than silently truncating the shift
    /// amount. For `right && arithmetic`, the fill bit is `bits`'s
    /// original sign bit at every stage (spec §4.D "barrel shifter").
    pub fn barrel_shift(&mut self, bits: &[NetId], amount: &[NetId], right: bool, arithmetic: bool) -> Vec<NetId> {
        let width = bits.len();
        if width == 0 {
            return Vec::new();
        }
        let fill = if right && arithmetic {
            *bits.last().unwrap()
        } else {
            self.const_net(false)
        };

        let mut current = bits.to_vec();
        let stages = (usize::BITS - width.max(1).leading_zeros()) as usize;
        for stage in 0..stages {
            let shift_amount = 1usize << stage;
            let mut shifted = Vec::with_capacity(width);
            for i in 0..width {
                let src_index = if right {
                    i.checked_add(shift_amount)
                } else {
                    i.checked_sub(shift_amount)
                };
                let value = match src_index {
                    Some(idx) if idx < width => current[idx],
                    _ => fill,
                };
                shifted.push(value);
            }
            let sel = amount.get(stage).copied().unwrap_or_else(|| self.const_net(false));
            current = self.mux_bus(sel, &shifted, &current);
        }

        // `stages` control bits can only represent shift amounts up to
        // `width - 1`; any higher amount bit being set means the true
        // shift amount exceeds that range, so the result is all `fill`
        // (matching the behavioral oracle, which masks the whole word to
        // zero for an out-of-range shift).
        if amount.len() > stages {
            let overflow = self.or_tree(&amount[stages..]);
            let all_fill = vec![fill; width];
            current = self.mux_bus(overflow, &all_fill, &current);
        }
        current
    }

    pub fn bit_reverse(&mut self, bits: &[NetId]) -> Vec<NetId> {
        bits.iter().rev().copied().collect()
    }

    /// Magnitude comparison (unsigned): returns `(less_than, equal)`.
    pub fn compare_unsigned(&mut self, a: &[NetId], b: &[NetId]) -> (NetId, NetId) {
        let width = a.len().max(b.len());
        let mut lt = self.const_net(false);
        let mut eq_so_far = self.const_net(true);
        for i in (0..width).rev() {
            let av = a.get(i).copied().unwrap_or_else(|| self.const_net(false));
            let bv = b.get(i).copied().unwrap_or_else(|| self.const_net(false));
            let not_av = self.gate_not(av);
            let bit_lt = self.gate_and(not_av, bv);
            let gated = self.gate_and(eq_so_far, bit_lt);
            lt = self.gate_or(lt, gated);
            let bits_equal = self.gate_xnor(av, bv);
            eq_so_far = self.gate_and(eq_so_far, bits_equal);
        }
        (lt, eq_so_far)
    }

    /// Emits one D flip-flop and returns its `q` net.
    pub fn dff(&mut self, d: NetId, rst: Option<NetId>, en: Option<NetId>, async_reset: bool, reset_value: bool) -> NetId {
        let q = self.alloc_net();
        self.dffs.push(Dff {
            d,
            q,
            rst,
            en,
            async_reset,
            reset_value,
        });
        q
    }

    /// Emits a DFF whose `q` is a specific, already-allocated net rather
    /// than a fresh one — used when lowering binds a sequential output to
    /// a net reserved during bit-blast, so other components that
    /// reference the same wire see the DFF's storage directly.
    pub fn dff_into(&mut self, d: NetId, q: NetId, rst: Option<NetId>, en: Option<NetId>, async_reset: bool, reset_value: bool) {
        self.dffs.push(Dff {
            d,
            q,
            rst,
            en,
            async_reset,
            reset_value,
        });
    }

    /// Multi-bit counterpart of [`NetlistBuilder::dff_into`].
    pub fn register_into(
        &mut self,
        d: &[NetId],
        q: &[NetId],
        rst: Option<NetId>,
        en: Option<NetId>,
        async_reset: bool,
        reset_values: &[bool],
    ) {
        for (i, (&d_bit, &q_bit)) in d.iter().zip(q.iter()).enumerate() {
            let reset_value = reset_values.get(i).copied().unwrap_or(false);
            self.dff_into(d_bit, q_bit, rst, en, async_reset, reset_value);
        }
    }

    /// Emits one DFF per bit of `d`, with a shared reset/enable.
    pub fn register(
        &mut self,
        d: &[NetId],
        rst: Option<NetId>,
        en: Option<NetId>,
        async_reset: bool,
        reset_values: &[bool],
    ) -> Vec<NetId> {
        d.iter()
            .enumerate()
            .map(|(i, &bit)| {
                let reset_value = reset_values.get(i).copied().unwrap_or(false);
                self.dff(bit, rst, en, async_reset, reset_value)
            })
            .collect()
    }

    /// T flip-flop rewritten as a D-FF with `d = t XOR q` (standard
    /// textbook identity, spec §4.D).
    pub fn t_flipflop(&mut self, t: NetId, rst: Option<NetId>, en: Option<NetId>, async_reset: bool, reset_value: bool) -> NetId {
        let q = self.alloc_net();
        let d = self.gate_xor(t, q);
        let real_q = self.dff(d, rst, en, async_reset, reset_value);
        self.drive(real_q, q);
        real_q
    }

    /// SR flip-flop rewritten as a D-FF: `d = s OR (NOT r AND q)` (set
    /// dominates, the conventional priority).
    pub fn sr_flipflop(&mut self, s: NetId, r: NetId, rst: Option<NetId>, en: Option<NetId>, async_reset: bool, reset_value: bool) -> NetId {
        let q = self.alloc_net();
        let not_r = self.gate_not(r);
        let hold = self.gate_and(not_r, q);
        let d = self.gate_or(s, hold);
        let real_q = self.dff(d, rst, en, async_reset, reset_value);
        self.drive(real_q, q);
        real_q
    }

    /// JK flip-flop rewritten as a D-FF: `d = (j AND NOT q) OR (NOT k AND
    /// q)`.
    pub fn jk_flipflop(&mut self, j: NetId, k: NetId, rst: Option<NetId>, en: Option<NetId>, async_reset: bool, reset_value: bool) -> NetId {
        let q = self.alloc_net();
        let not_q = self.gate_not(q);
        let not_k = self.gate_not(k);
        let set_term = self.gate_and(j, not_q);
        let hold_term = self.gate_and(not_k, q);
        let d = self.gate_or(set_term, hold_term);
        let real_q = self.dff(d, rst, en, async_reset, reset_value);
        self.drive(real_q, q);
        real_q
    }

    /// An up-counter: `width` bits, incrementing by 1 each active edge
    /// while `en` is asserted. Returns `(q, overflow)` where `overflow` is
    /// the carry-out of the final increment (1 on wraparound).
    pub fn counter(
        &mut self,
        width: u32,
        rst: Option<NetId>,
        en: Option<NetId>,
        async_reset: bool,
    ) -> (Vec<NetId>, NetId) {
        let q_nets = self.alloc_bus(width);
        let one = self.const_bus(width, 1);
        let zero = self.const_net(false);
        let (next, overflow) = self.ripple_adder(&q_nets, &one, zero);
        let reset_values = vec![false; width as usize];
        let real_q = self.register(&next, rst, en, async_reset, &reset_values);
        for (placeholder, real) in q_nets.iter().zip(real_q.iter()) {
            self.drive(*real, *placeholder);
        }
        (q_nets, overflow)
    }

    /// Simple synchronous shift register: `width` bits, shifting in
    /// `serial_in` at the LSB (or MSB, if `shift_left`) each active edge
    /// while `en` is asserted.
    pub fn shift_register(
        &mut self,
        width: u32,
        serial_in: NetId,
        shift_left: bool,
        rst: Option<NetId>,
        en: Option<NetId>,
        async_reset: bool,
    ) -> Vec<NetId> {
        let q_nets = self.alloc_bus(width);
        let next: Vec<NetId> = if shift_left {
            let mut v = vec![serial_in];
            v.extend_from_slice(&q_nets[..q_nets.len().saturating_sub(1)]);
            v
        } else {
            let mut v = q_nets[1..].to_vec();
            v.push(serial_in);
            v
        };
        let reset_values = vec![false; width as usize];
        let real_q = self.register(&next, rst, en, async_reset, &reset_values);
        for (placeholder, real) in q_nets.iter().zip(real_q.iter()) {
            self.drive(*real, *placeholder);
        }
        q_nets
    }

    /// A read-combinational, write-synchronous register file: `depth`
    /// entries of `width` bits. `write_addr`/`read_addr` are `ceil(log2
    /// depth)`-bit selectors. Returns `(entries, read_data)` where
    /// `entries[i]` is the `i`th register's `q` bus.
    pub fn register_file(
        &mut self,
        depth: usize,
        width: u32,
        write_addr: &[NetId],
        write_data: &[NetId],
        write_enable: NetId,
        read_addr: &[NetId],
        rst: Option<NetId>,
        async_reset: bool,
    ) -> (Vec<Vec<NetId>>, Vec<NetId>) {
        let mut entries = Vec::with_capacity(depth);
        for i in 0..depth {
            let q_nets = self.alloc_bus(width);
            let selected = self.equal_const(write_addr, i as u64);
            let entry_en = self.gate_and(selected, write_enable);
            let reset_values = vec![false; width as usize];
            let real_q = self.register(write_data, rst, Some(entry_en), async_reset, &reset_values);
            for (placeholder, real) in q_nets.iter().zip(real_q.iter()) {
                self.drive(*real, *placeholder);
            }
            entries.push(q_nets);
        }
        let cases: Vec<(u64, Vec<NetId>)> = entries
            .iter()
            .enumerate()
            .map(|(i, bus)| (i as u64, bus.clone()))
            .collect();
        let default = self.const_bus(width, 0);
        let read_data = self.select_tree(read_addr, &cases, &default);
        (entries, read_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_tree_reduces_left_leaning() {
        let mut b = NetlistBuilder::new();
        let ins: Vec<NetId> = (0..5).map(|_| b.alloc_net()).collect();
        let out = b.and_tree(&ins);
        assert_ne!(out, ins[0]);
        assert!(b.gates.iter().any(|g| matches!(g, Gate::And { .. })));
    }

    #[test]
    fn const_net_is_cached() {
        let mut b = NetlistBuilder::new();
        let a = b.const_net(true);
        let c = b.const_net(true);
        assert_eq!(a, c);
        assert_eq!(b.gates.iter().filter(|g| g.const_value().is_some()).count(), 1);
    }

    #[test]
    fn ripple_adder_eight_bit_overflow_scenario_s2() {
        // S2: a=0xFF, b=0x01, cin=0 -> sum=0x00, cout=1.
        // We can't evaluate gates here (that's hdlcore-eval's job); this
        // test only checks structural shape: width and gate count.
        let mut b = NetlistBuilder::new();
        let a = b.alloc_bus(8);
        let bb = b.alloc_bus(8);
        let cin = b.const_net(false);
        let (sum, _cout) = b.ripple_adder(&a, &bb, cin);
        assert_eq!(sum.len(), 8);
    }

    #[test]
    fn restoring_divider_preserves_width() {
        let mut b = NetlistBuilder::new();
        let dividend = b.alloc_bus(8);
        let divisor = b.alloc_bus(8);
        let (q, r) = b.restoring_divider(&dividend, &divisor);
        assert_eq!(q.len(), 8);
        assert_eq!(r.len(), 8);
    }

    #[test]
    fn decoder_produces_power_of_two_outputs() {
        let mut b = NetlistBuilder::new();
        let sel = b.alloc_bus(3);
        let out = b.decoder(&sel);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn barrel_shift_preserves_width() {
        let mut b = NetlistBuilder::new();
        let bits = b.alloc_bus(8);
        let amount = b.alloc_bus(3);
        let shifted = b.barrel_shift(&bits, &amount, true, false);
        assert_eq!(shifted.len(), 8);
    }

    #[test]
    fn barrel_shift_amount_beyond_control_bits_forces_all_fill() {
        // 4-bit value only needs 2 stage-selector bits; an 8-bit amount
        // with a high bit set is out of the representable shift range and
        // must zero the whole result rather than silently wrapping.
        let mut b = NetlistBuilder::new();
        let bits = b.alloc_bus(4);
        let amount = b.alloc_bus(8);
        let shifted = b.barrel_shift(&bits, &amount, true, false);

        let ir = hdlcore::Netlist::new(
            "barrel_shift_overflow",
            b.net_count,
            vec![("bits".into(), bits), ("amount".into(), amount)],
            vec![("shifted".into(), shifted)],
            b.gates,
            b.dffs,
        );
        let mut sim = hdlcore_eval::Simulator::<hdlcore_eval::ScalarWord>::new(ir, 1, false).unwrap();
        sim.poke_scalar("bits", 0, 0b1111).unwrap();
        sim.poke_scalar("amount", 0, 16).unwrap();
        sim.evaluate().unwrap();
        assert_eq!(sim.peek_scalar("shifted", 0).unwrap(), 0);
    }

    #[test]
    fn compare_unsigned_returns_two_flags() {
        let mut b = NetlistBuilder::new();
        let a = b.alloc_bus(4);
        let bb = b.alloc_bus(4);
        let (lt, eq) = b.compare_unsigned(&a, &bb);
        assert_ne!(lt, eq);
    }

    #[test]
    fn register_file_read_port_has_requested_width() {
        let mut b = NetlistBuilder::new();
        let write_addr = b.alloc_bus(2);
        let write_data = b.alloc_bus(8);
        let write_enable = b.alloc_net();
        let read_addr = b.alloc_bus(2);
        let (entries, read_data) = b.register_file(4, 8, &write_addr, &write_data, write_enable, &read_addr, None, false);
        assert_eq!(entries.len(), 4);
        assert_eq!(read_data.len(), 8);
        assert!(entries.iter().all(|entry| entry.len() == 8));
    }

    #[test]
    fn shift_register_shifts_in_one_bit_per_cycle() {
        let mut b = NetlistBuilder::new();
        let serial_in = b.alloc_net();
        let q = b.shift_register(8, serial_in, false, None, None, false);
        assert_eq!(q.len(), 8);
        assert_eq!(b.dffs.len(), 8);
    }
}
