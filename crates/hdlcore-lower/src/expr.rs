//! Lowers a behavioral [`Expr`] tree into a bus of fresh nets (spec §4.D
//! step 3 "emit primitives"), reusing the standard-cell emitters in
//! [`crate::builder`].

use std::collections::HashMap;

use hdlcore::{Error, Locator, NetId, Result};
use hdlcore_behavioral::{BinOp, Expr, UnOp};

use crate::builder::NetlistBuilder;

/// Name → already-lowered net bus (LSB first), the environment an `Expr`
/// is lowered against.
pub type NetEnv = HashMap<String, Vec<NetId>>;

/// Recursively lowers `expr` into a fresh net bus.
pub fn lower_expr(expr: &Expr, env: &NetEnv, b: &mut NetlistBuilder) -> Result<Vec<NetId>> {
    match expr {
        Expr::Const { width, value } => Ok(b.const_bus(*width, *value)),
        Expr::Signal(name) => env.get(name).cloned().ok_or_else(|| Error::UnknownPort {
            port: name.clone(),
            locator: Locator::Component(name.clone()),
        }),
        Expr::Unary { op, operand } => {
            let v = lower_expr(operand, env, b)?;
            match op {
                UnOp::Not => Ok(b.not_bus(&v)),
            }
        }
        Expr::Binary { op, lhs, rhs } => lower_binary(*op, lhs, rhs, env, b),
        Expr::Index { base, bit } => {
            let v = lower_expr(base, env, b)?;
            let net = *v.get(*bit as usize).ok_or_else(|| Error::InvalidWidth {
                width: *bit,
                locator: Locator::Unknown,
            })?;
            Ok(vec![net])
        }
        Expr::Slice { base, hi, lo } => {
            if hi < lo {
                return Err(Error::InvalidWidth {
                    width: *hi,
                    locator: Locator::Unknown,
                });
            }
            let v = lower_expr(base, env, b)?;
            let lo = *lo as usize;
            let hi = *hi as usize;
            if hi >= v.len() {
                return Err(Error::WidthMismatch {
                    expected: hi as u32 + 1,
                    actual: v.len() as u32,
                    locator: Locator::Unknown,
                });
            }
            Ok(v[lo..=hi].to_vec())
        }
        Expr::Concat(parts) => {
            let mut lowered = Vec::with_capacity(parts.len());
            for part in parts {
                lowered.push(lower_expr(part, env, b)?);
            }
            // The grammar's first element is the most-significant chunk;
            // our net buses are LSB-first, so the last lowered part goes
            // first into the output vector.
            let mut out = Vec::new();
            for part in lowered.iter().rev() {
                out.extend_from_slice(part);
            }
            Ok(out)
        }
        Expr::Replicate { value, count } => {
            let v = lower_expr(value, env, b)?;
            let mut out = Vec::with_capacity(v.len() * *count as usize);
            for _ in 0..*count {
                out.extend_from_slice(&v);
            }
            Ok(out)
        }
        Expr::SignExtend { value, width } => {
            let v = lower_expr(value, env, b)?;
            if *width < v.len() as u32 {
                return Err(Error::WidthMismatch {
                    expected: *width,
                    actual: v.len() as u32,
                    locator: Locator::Unknown,
                });
            }
            Ok(b.sign_extend(&v, *width))
        }
        Expr::ZeroExtend { value, width } => {
            let v = lower_expr(value, env, b)?;
            if *width < v.len() as u32 {
                return Err(Error::WidthMismatch {
                    expected: *width,
                    actual: v.len() as u32,
                    locator: Locator::Unknown,
                });
            }
            Ok(b.zero_extend(&v, *width))
        }
        Expr::Select {
            selector,
            cases,
            default,
        } => {
            let sel = lower_expr(selector, env, b)?;
            let default_nets = lower_expr(default, env, b)?;
            let mut lowered_cases = Vec::with_capacity(cases.len());
            for (key, expr) in cases {
                lowered_cases.push((*key, lower_expr(expr, env, b)?));
            }
            Ok(b.select_tree(&sel, &lowered_cases, &default_nets))
        }
        Expr::Let {
            name,
            width,
            value,
            body,
        } => {
            let v = lower_expr(value, env, b)?;
            let bound = b.zero_extend(&v, *width);
            let mut inner = env.clone();
            inner.insert(name.clone(), bound);
            lower_expr(body, &inner, b)
        }
    }
}

fn lower_binary(op: BinOp, lhs: &Expr, rhs: &Expr, env: &NetEnv, b: &mut NetlistBuilder) -> Result<Vec<NetId>> {
    let l = lower_expr(lhs, env, b)?;
    let r = lower_expr(rhs, env, b)?;
    let zero = b.const_net(false);
    Ok(match op {
        BinOp::And => b.and_bus(&l, &r),
        BinOp::Or => b.or_bus(&l, &r),
        BinOp::Xor => b.xor_bus(&l, &r),
        BinOp::Add => b.ripple_adder(&l, &r, zero).0,
        BinOp::Sub => b.ripple_subtractor(&l, &r).0,
        BinOp::Shl => b.barrel_shift(&l, &r, false, false),
        BinOp::Shr => b.barrel_shift(&l, &r, true, false),
        BinOp::Sar => b.barrel_shift(&l, &r, true, true),
        BinOp::Eq => vec![b.equal_bus(&l, &r)],
        BinOp::Ne => {
            let eq = b.equal_bus(&l, &r);
            vec![b.gate_not(eq)]
        }
        BinOp::Lt => vec![b.compare_unsigned(&l, &r).0],
        BinOp::Ge => {
            let (lt, _eq) = b.compare_unsigned(&l, &r);
            vec![b.gate_not(lt)]
        }
        BinOp::Gt => {
            let (lt, eq) = b.compare_unsigned(&l, &r);
            let le = b.gate_or(lt, eq);
            vec![b.gate_not(le)]
        }
        BinOp::Le => {
            let (lt, eq) = b.compare_unsigned(&l, &r);
            vec![b.gate_or(lt, eq)]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlcore_behavioral::Expr;

    #[test]
    fn const_expr_lowers_to_matching_width() {
        let mut b = NetlistBuilder::new();
        let env = NetEnv::new();
        let nets = lower_expr(&Expr::Const { width: 4, value: 0b1010 }, &env, &mut b).unwrap();
        assert_eq!(nets.len(), 4);
    }

    #[test]
    fn unknown_signal_is_an_error() {
        let mut b = NetlistBuilder::new();
        let env = NetEnv::new();
        let result = lower_expr(&Expr::Signal("missing".into()), &env, &mut b);
        assert!(result.is_err());
    }

    #[test]
    fn concat_places_first_operand_as_msb() {
        let mut b = NetlistBuilder::new();
        let env = NetEnv::new();
        let expr = Expr::Concat(vec![
            Expr::Const { width: 2, value: 0b11 },
            Expr::Const { width: 2, value: 0b00 },
        ]);
        let nets = lower_expr(&expr, &env, &mut b).unwrap();
        assert_eq!(nets.len(), 4);
    }
}
