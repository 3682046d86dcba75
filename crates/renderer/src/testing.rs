//! Software stand-in for a GL context that tracks every live handle.
//!
//! Compilation succeeds when delimiters balance; linking succeeds when both
//! stages define `main(`. Attribute and uniform locations come from the
//! `attribute`/`uniform` declarations in the attached sources.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::gl::GlApi;
use crate::types::StageKind;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UniformWrite {
    Float(String, f32),
    Vec2(String, f32, f32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeLocation {
    program: u32,
    name: String,
}

#[derive(Debug)]
struct FakeShader {
    kind: StageKind,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct FakeProgram {
    attached: Vec<u32>,
    linked: bool,
    log: String,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u32,
    shaders: HashMap<u32, FakeShader>,
    programs: HashMap<u32, FakeProgram>,
    buffers: HashSet<u32>,
    shaders_created: usize,
    programs_created: usize,
    current_program: Option<u32>,
    bound_buffer: Option<u32>,
    enabled_attributes: Vec<(u32, Option<u32>)>,
    viewport: Option<(i32, i32, i32, i32)>,
    draws: Vec<u32>,
    uniform_writes: Vec<UniformWrite>,
    fail_buffer_creation: bool,
}

impl FakeState {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeGl {
    state: Rc<RefCell<FakeState>>,
}

impl FakeGl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn without_buffers() -> Self {
        let gl = Self::default();
        gl.state.borrow_mut().fail_buffer_creation = true;
        gl
    }

    /// Second handle onto the same state, for inspecting a context after its
    /// owner is gone.
    pub(crate) fn handle(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }

    pub(crate) fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub(crate) fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub(crate) fn shaders_created(&self) -> usize {
        self.state.borrow().shaders_created
    }

    pub(crate) fn programs_created(&self) -> usize {
        self.state.borrow().programs_created
    }

    pub(crate) fn is_live_program(&self, program: u32) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    pub(crate) fn draw_count(&self) -> usize {
        self.state.borrow().draws.len()
    }

    /// Program bound by each draw call, oldest first.
    pub(crate) fn drawn_programs(&self) -> Vec<u32> {
        self.state.borrow().draws.clone()
    }

    pub(crate) fn uniform_writes(&self) -> Vec<UniformWrite> {
        self.state.borrow().uniform_writes.clone()
    }

    pub(crate) fn last_viewport(&self) -> Option<(i32, i32, i32, i32)> {
        self.state.borrow().viewport
    }

    /// `(attribute index, buffer)` pairs in the order they were enabled.
    pub(crate) fn enabled_attributes(&self) -> Vec<(u32, Option<u32>)> {
        self.state.borrow().enabled_attributes.clone()
    }
}

fn delimiters_balance(source: &str) -> bool {
    let mut stack = Vec::new();
    for ch in source.chars() {
        match ch {
            '(' | '{' | '[' => stack.push(ch),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

fn declared_names(source: &str, qualifier: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(qualifier))
        .filter_map(|rest| {
            let declaration = rest.trim().trim_end_matches(';');
            declaration
                .split_whitespace()
                .last()
                .map(|name| name.trim_end_matches(';').to_string())
        })
        .collect()
}

impl GlApi for FakeGl {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type UniformLocation = FakeLocation;

    fn create_shader(&self, kind: StageKind) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.shaders_created += 1;
        state.shaders.insert(
            id,
            FakeShader {
                kind,
                source: String::new(),
                compiled: false,
            },
        );
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(entry) = self.state.borrow_mut().shaders.get_mut(&shader) {
            entry.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(entry) = self.state.borrow_mut().shaders.get_mut(&shader) {
            entry.compiled = !entry.source.trim().is_empty() && delimiters_balance(&entry.source);
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|entry| entry.compiled)
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        match self.state.borrow().shaders.get(&shader) {
            Some(entry) if !entry.compiled => {
                format!("ERROR: 0:1: syntax error in {} shader", entry.kind)
            }
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: u32) {
        let removed = self.state.borrow_mut().shaders.remove(&shader);
        assert!(removed.is_some(), "shader {shader} released twice");
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.programs_created += 1;
        state.programs.insert(id, FakeProgram::default());
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(entry) = self.state.borrow_mut().programs.get_mut(&program) {
            entry.attached.push(shader);
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let Some(entry) = self.state.borrow_mut().programs.get_mut(&program) {
            entry.attached.retain(|attached| *attached != shader);
        }
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let stages: Vec<(StageKind, String, bool)> = state
            .programs
            .get(&program)
            .map(|entry| {
                entry
                    .attached
                    .iter()
                    .filter_map(|id| state.shaders.get(id))
                    .map(|shader| (shader.kind, shader.source.clone(), shader.compiled))
                    .collect()
            })
            .unwrap_or_default();

        let mut log = String::new();
        for kind in [StageKind::Vertex, StageKind::Fragment] {
            match stages.iter().find(|(stage, _, _)| *stage == kind) {
                Some((_, source, true)) if source.contains("main(") => {}
                Some((_, _, true)) => log = format!("ERROR: missing main() in {kind} shader"),
                _ => log = format!("ERROR: no compiled {kind} shader attached"),
            }
        }

        let mut attributes = Vec::new();
        let mut uniforms = Vec::new();
        for (_, source, _) in &stages {
            attributes.extend(declared_names(source, "attribute "));
            uniforms.extend(declared_names(source, "uniform "));
        }

        if let Some(entry) = state.programs.get_mut(&program) {
            entry.linked = log.is_empty();
            entry.log = log;
            entry.attributes = attributes;
            entry.uniforms = uniforms;
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|entry| entry.linked)
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|entry| entry.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let removed = state.programs.remove(&program);
        assert!(removed.is_some(), "program {program} released twice");
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let entry = state.programs.get(&program)?;
        entry
            .attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<FakeLocation> {
        let state = self.state.borrow();
        let entry = state.programs.get(&program)?;
        entry
            .uniforms
            .iter()
            .any(|uniform| uniform == name)
            .then(|| FakeLocation {
                program,
                name: name.to_string(),
            })
    }

    fn use_program(&self, program: Option<u32>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = program {
            assert!(state.programs.contains_key(&id), "using released program {id}");
        }
        state.current_program = program;
    }

    fn uniform_1f(&self, location: &FakeLocation, x: f32) {
        let mut state = self.state.borrow_mut();
        assert_eq!(state.current_program, Some(location.program));
        state
            .uniform_writes
            .push(UniformWrite::Float(location.name.clone(), x));
    }

    fn uniform_2f(&self, location: &FakeLocation, x: f32, y: f32) {
        let mut state = self.state.borrow_mut();
        assert_eq!(state.current_program, Some(location.program));
        state
            .uniform_writes
            .push(UniformWrite::Vec2(location.name.clone(), x, y));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_buffer_creation {
            return Err("out of memory".to_string());
        }
        let id = state.allocate();
        state.buffers.insert(id);
        Ok(id)
    }

    fn upload_static_vertices(&self, buffer: u32, data: &[f32]) {
        let mut state = self.state.borrow_mut();
        assert!(state.buffers.contains(&buffer));
        assert_eq!(data.len(), 8);
        state.bound_buffer = Some(buffer);
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        self.state.borrow_mut().bound_buffer = buffer;
    }

    fn delete_buffer(&self, buffer: u32) {
        let removed = self.state.borrow_mut().buffers.remove(&buffer);
        assert!(removed, "buffer {buffer} released twice");
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_buffer;
        state.enabled_attributes.push((index, bound));
    }

    fn vertex_attrib_pointer_f32(&self, _index: u32, components: i32, stride: i32, offset: i32) {
        assert_eq!((components, stride, offset), (2, 0, 0));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().viewport = Some((x, y, width, height));
    }

    fn clear_to(&self, _r: f32, _g: f32, _b: f32, _a: f32) {}

    fn draw_triangle_strip(&self, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        assert_eq!((first, count), (0, 4));
        let program = state
            .current_program
            .expect("draw issued without a program in use");
        state.draws.push(program);
    }
}
