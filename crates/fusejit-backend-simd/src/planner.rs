//! Register and resource planning for a fused operator sequence.
//!
//! The planner walks the subgraph in order, keeps a last-use position per
//! operand, and hands each emitter its input, output, and scratch registers.
//! An operand's register returns to the pool once its last consumer has
//! emitted. There is no spill path: running out of registers is a
//! compile-time error the caller handles by not fusing.

use std::collections::HashMap;

use fusejit::{ElementType, FusedSubgraph, OperandRef, PartialShape};

use crate::code::{Assembler, Gpr, Instr, VecReg};
use crate::emitters::{emitter_for, EmitCtx, Emitter};
use crate::error::{CompileError, CompileResult};
use crate::isa::IsaLevel;
use crate::kernel::OperandLayout;
use crate::table::ConstantTable;

/// Everything the kernel artifact needs from planning.
pub(crate) struct Plan {
    pub code: Vec<u8>,
    pub table: ConstantTable,
    /// Pointer register per subgraph input, in input order.
    pub input_pointers: Vec<Gpr>,
    /// How each input buffer is read, in input order.
    pub input_layouts: Vec<OperandLayout>,
    pub output_pointer: Gpr,
    pub output_element: ElementType,
}

pub(crate) fn plan(subgraph: &FusedSubgraph, isa: IsaLevel) -> CompileResult<Plan> {
    let Some(result) = subgraph.result() else {
        return Err(CompileError::EmptySubgraph);
    };
    let output_element = result.element;

    // Every input must either cover the full result extent or be a single
    // scalar the kernel splats; anything in between would need a strided
    // load the instruction format does not have.
    let mut input_layouts = Vec::with_capacity(subgraph.inputs().len());
    for (index, desc) in subgraph.inputs().iter().enumerate() {
        let layout = if same_extent(&desc.shape, &result.shape) {
            OperandLayout::Vector
        } else if desc.shape.element_count() == Some(1) {
            OperandLayout::ScalarSplat
        } else {
            return Err(CompileError::UnsupportedBroadcast {
                input: index,
                shape: desc.shape.to_string(),
                result: result.shape.to_string(),
            });
        };
        input_layouts.push(layout);
    }

    // One emitter per node, with its input precisions checked up front.
    let mut emitters: Vec<Box<dyn Emitter>> = Vec::with_capacity(subgraph.nodes().len());
    for node in subgraph.nodes() {
        let emitter = emitter_for(&node.kind).ok_or_else(|| {
            CompileError::Internal(format!("no emitter registered for {}", node.kind.name()))
        })?;
        for &arg in &node.args {
            let desc = subgraph.descriptor(arg).ok_or_else(|| {
                CompileError::Internal(format!(
                    "node {} references an operand with no descriptor",
                    node.kind.name()
                ))
            })?;
            if !emitter.supported_precisions().contains(&desc.element) {
                return Err(CompileError::unsupported_precision(
                    node.kind.name(),
                    desc.element,
                ));
            }
        }
        emitters.push(emitter);
    }

    // Constant-table entries are collected before any code is emitted so
    // identical patterns across emitters share slots.
    let mut table = ConstantTable::new();
    for emitter in &emitters {
        emitter.register_table_entries(&mut table);
    }

    // General-purpose register layout: input pointers, output pointer,
    // table base, then emitter scratch.
    let aux_gprs = emitters.iter().map(|e| e.aux_gprs()).max().unwrap_or(0);
    let gprs_needed =
        subgraph.inputs().len() + 1 + usize::from(!table.is_empty()) + aux_gprs;
    if gprs_needed > isa.general_registers() {
        return Err(CompileError::ResourceExhaustion {
            resource: "general-purpose",
            needed: gprs_needed,
            available: isa.general_registers(),
        });
    }
    let input_pointers: Vec<Gpr> = (0..subgraph.inputs().len())
        .map(|i| Gpr(i as u8))
        .collect();
    let output_pointer = Gpr(subgraph.inputs().len() as u8);
    let table_base = if table.is_empty() {
        None
    } else {
        Some(Gpr(subgraph.inputs().len() as u8 + 1))
    };

    let last_use = compute_last_use(subgraph);

    let mut pool = RegisterPool::new(isa.vector_registers());
    let mut assigned: HashMap<OperandRef, VecReg> = HashMap::new();
    let mut asm = Assembler::new();

    // The table pointer is materialized once, before the first operator
    // that reads a constant.
    if let Some(base) = table_base {
        asm.push(Instr::LoadTableBase { dst: base });
    }

    // Load every input that some node actually consumes.
    for (index, pointer) in input_pointers.iter().enumerate() {
        let operand = OperandRef::Input(index);
        if !last_use.contains_key(&operand) {
            continue;
        }
        let reg = pool.take("vector", 1)?;
        match input_layouts[index] {
            OperandLayout::Vector => asm.push(Instr::LoadVec {
                dst: reg,
                base: *pointer,
                offset: 0,
            }),
            OperandLayout::ScalarSplat => asm.push(Instr::LoadSplat {
                dst: reg,
                base: *pointer,
            }),
        }
        assigned.insert(operand, reg);
    }

    for (index, (node, emitter)) in subgraph.nodes().iter().zip(&emitters).enumerate() {
        let mut args = Vec::with_capacity(node.args.len());
        for &arg in &node.args {
            let reg = assigned.get(&arg).copied().ok_or_else(|| {
                CompileError::Internal(format!(
                    "operand {arg:?} was never assigned a register"
                ))
            })?;
            args.push(reg);
        }

        // Scratch and destination are taken while the arguments are still
        // held, so an emitter never sees its scratch alias a live input.
        let aux = pool.take_many("vector", emitter.aux_vecs(isa))?;
        let dst = pool.take("vector", 1)?;

        let mut ctx = EmitCtx {
            asm: &mut asm,
            isa,
            inputs: &args,
            dst,
            aux: &aux,
            table_base,
            table: &table,
        };
        emitter.emit(&mut ctx)?;

        for reg in aux {
            pool.give_back(reg);
        }
        for &arg in &node.args {
            if last_use.get(&arg) == Some(&index) {
                if let Some(reg) = assigned.remove(&arg) {
                    // A value may be passed twice to one node; the second
                    // removal is a no-op.
                    pool.give_back(reg);
                }
            }
        }
        let out = OperandRef::Node(index);
        if last_use.contains_key(&out) {
            assigned.insert(out, dst);
        } else {
            // Nothing consumes this value; its register frees right away.
            pool.give_back(dst);
        }
    }

    let result_ref = OperandRef::Node(subgraph.nodes().len() - 1);
    let result_reg = assigned.get(&result_ref).copied().ok_or_else(|| {
        CompileError::Internal("subgraph result was never assigned a register".to_string())
    })?;
    asm.push(Instr::StoreVec {
        src: result_reg,
        base: output_pointer,
        offset: 0,
    });

    Ok(Plan {
        code: asm.finish(),
        table,
        input_pointers,
        input_layouts,
        output_pointer,
        output_element,
    })
}

/// True when two shapes describe the same element layout, labels aside.
fn same_extent(a: &PartialShape, b: &PartialShape) -> bool {
    match (a.dims(), b.dims()) {
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| x.lo() == y.lo() && x.hi() == y.hi())
        }
        (None, None) => true,
        _ => false,
    }
}

/// Last node index consuming each operand. The subgraph result is pinned
/// past the end of the sequence so its register survives until the store.
fn compute_last_use(subgraph: &FusedSubgraph) -> HashMap<OperandRef, usize> {
    let mut last_use: HashMap<OperandRef, usize> = HashMap::new();
    for (index, node) in subgraph.nodes().iter().enumerate() {
        for &arg in &node.args {
            last_use.insert(arg, index);
        }
    }
    last_use.insert(
        OperandRef::Node(subgraph.nodes().len() - 1),
        subgraph.nodes().len(),
    );
    last_use
}

/// Free-list allocator over one architectural register class.
struct RegisterPool {
    free: Vec<VecReg>,
    capacity: usize,
}

impl RegisterPool {
    fn new(capacity: usize) -> Self {
        // LIFO order so recently freed registers are reused first.
        let free = (0..capacity).rev().map(|i| VecReg(i as u8)).collect();
        RegisterPool { free, capacity }
    }

    fn take(&mut self, resource: &'static str, want: usize) -> CompileResult<VecReg> {
        self.free.pop().ok_or(CompileError::ResourceExhaustion {
            resource,
            needed: self.capacity + want,
            available: self.capacity,
        })
    }

    fn take_many(&mut self, resource: &'static str, count: usize) -> CompileResult<Vec<VecReg>> {
        if self.free.len() < count {
            return Err(CompileError::ResourceExhaustion {
                resource,
                needed: self.capacity - self.free.len() + count,
                available: self.capacity,
            });
        }
        Ok((0..count).filter_map(|_| self.free.pop()).collect())
    }

    fn give_back(&mut self, reg: VecReg) {
        self.free.push(reg);
    }
}
