//! Narrow graphics API used by the shader lifecycle code.
//!
//! Only the handful of GL ES 2.0 entry points the editor needs are exposed.
//! The production implementation forwards to [`glow::Context`]; everything
//! `unsafe` about raw GL lives in that impl so the compiler, linker, geometry
//! and render loop stay safe code.

use std::fmt::Debug;

use glow::HasContext;

use crate::types::StageKind;

pub trait GlApi {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Buffer: Copy + Debug;
    type UniformLocation: Clone + Debug;

    fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn use_program(&self, program: Option<Self::Program>);
    fn uniform_1f(&self, location: &Self::UniformLocation, x: f32);
    fn uniform_2f(&self, location: &Self::UniformLocation, x: f32, y: f32);

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    /// Binds `buffer` as the array buffer and uploads `data` with static usage.
    fn upload_static_vertices(&self, buffer: Self::Buffer, data: &[f32]);
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Describes a tightly packed float attribute sourced from the bound array buffer.
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32, stride: i32, offset: i32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Clears the colour buffer to the given colour.
    fn clear_to(&self, r: f32, g: f32, b: f32, a: f32);
    fn draw_triangle_strip(&self, first: i32, count: i32);
}

fn gl_stage(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
    }
}

// SAFETY (all methods below): the context is only constructed by the preview
// window after it has been made current on the thread that drives the event
// loop, and every handle passed in was produced by this same context.
impl GlApi for glow::Context {
    type Shader = glow::NativeShader;
    type Program = glow::NativeProgram;
    type Buffer = glow::NativeBuffer;
    type UniformLocation = glow::NativeUniformLocation;

    fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, gl_stage(kind)) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.get_attrib_location(program, name) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn uniform_1f(&self, location: &Self::UniformLocation, x: f32) {
        unsafe { self.uniform_1_f32(Some(location), x) }
    }

    fn uniform_2f(&self, location: &Self::UniformLocation, x: f32, y: f32) {
        unsafe { self.uniform_2_f32(Some(location), x, y) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn upload_static_vertices(&self, buffer: Self::Buffer, data: &[f32]) {
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
        }
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        unsafe { self.bind_buffer(glow::ARRAY_BUFFER, buffer) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(
                self,
                index,
                components,
                glow::FLOAT,
                false,
                stride,
                offset,
            )
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn clear_to(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            HasContext::clear_color(self, r, g, b, a);
            HasContext::clear(self, glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangle_strip(&self, first: i32, count: i32) {
        unsafe { self.draw_arrays(glow::TRIANGLE_STRIP, first, count) }
    }
}
