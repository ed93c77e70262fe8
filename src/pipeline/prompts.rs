//! Prompt text for each pipeline stage.
//!
//! Stages communicate only through files in the part workspace, so every
//! prompt names the files it reads and the files it must write.

use crate::race::Part;

const VERDICT_FOOTER: &str = "
<IMPORTANT>
The very last line of your response must be the single word \"Success\" or \"Failure\".
The orchestrator reads that line to decide what happens next.
</IMPORTANT>
";

const PART_TWO_CONTEXT: &str = "
PART 2 CONTEXT:
This is part 2 of a two-part puzzle. Part 1 artifacts are available when present:
- part_1_puzzle.md: the full part 1 puzzle text (read this first)
- part_1_problem.md: the simplified part 1 problem report
- part_1_solution.py: the code that solved part 1
- part_1_answer.txt: the part 1 answer, sometimes needed as an input
Part 2 text usually assumes part 1 is understood. Work out exactly what changed,
and prefer extending part_1_solution.py over starting from scratch.
";

/// What a coding pass is reacting to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingFeedback {
    Initial,
    TestFailures,
    SubmissionRejected,
}

pub fn translation(part: Part) -> String {
    let mut prompt = String::from(
        "
You are a translation agent. The puzzle in puzzle.md is told as a story, and most of
the story does not matter for computing the answer. Read it carefully and write a
problem report to problem.md that states:

1. What has to be computed
2. The shape and meaning of the input (input.md holds the real input)
3. The exact expected output, including its format

Keep enough context that a reader of problem.md understands why the algorithm is needed.
",
    );
    if part == Part::Two {
        prompt.push_str(PART_TWO_CONTEXT);
    }
    prompt
}

pub fn planning(revision: bool) -> String {
    let mut prompt = String::from(
        "
You are a planning agent. Using problem.md and input.md, write two plans:

1. implementation_plan.md: a step-by-step plan for a Python solution. Consider the
   input size and choose an algorithm that finishes in reasonable time.
2. test_plan.md: how to verify the solution, including the worked examples from the
   puzzle and the edge cases that matter.

This is a one-off script, not a production system. Skip logging, error handling and
scalability concerns that do not affect getting the right answer.
",
    );
    if revision {
        prompt.push_str(
            "
<UPDATE>
This is your second planning pass. Your first plans are in implementation_plan.md and
test_plan.md, and a critique of them is in critique.md. Update both plans to address it.
</UPDATE>
",
        );
    }
    prompt
}

pub fn critique() -> String {
    "
You are a critique agent. Review implementation_plan.md and test_plan.md against
problem.md. Check that the plans are detailed enough, use an efficient algorithm,
actually solve the stated problem and verify the result. Remember this is a one-off
script. If the plans are already sound, say so. Write the critique to critique.md.
"
    .to_string()
}

pub fn coding(feedback: CodingFeedback) -> String {
    let mut prompt = String::from(
        "
You are a coding agent. The problem is in problem.md, the input in input.md, the
implementation plan in implementation_plan.md and the test plan in test_plan.md.

Write a Python solution to solution.py, test it as the test plan describes and iterate
until it works. Keep it simple. Summarize what you built and how testing went in
implementation_summary.md.
",
    );
    match feedback {
        CodingFeedback::Initial => {}
        CodingFeedback::TestFailures => prompt.push_str(
            "
<UPDATE>
A testing agent found your previous solution insufficient. Its findings are in
testing_issues.md; your previous summary is in implementation_summary.md and your
previous code in solution.py. Fix the problems it found.
</UPDATE>
",
        ),
        CodingFeedback::SubmissionRejected => prompt.push_str(
            "
<UPDATE>
Your previous answer passed local tests but was rejected. The rejection details are in
submission_issues.md, possibly with a hint that the answer was too high or too low.
Re-read the puzzle, find the flaw in solution.py and fix it.
</UPDATE>
",
        ),
    }
    prompt
}

pub fn testing() -> String {
    let mut prompt = String::from(
        "
You are a testing agent. Verify solution.py against problem.md, input.md, test_plan.md
and implementation_summary.md.

If the problem is not solved, write the issues you found to testing_issues.md.
If it is solved, write only the final answer value to answer.txt.
",
    );
    prompt.push_str(VERDICT_FOOTER);
    prompt
}

pub fn one_shot(part: Part, retry: bool) -> String {
    let mut prompt = String::from(
        "
You are a fast-solving agent. Solve the puzzle in a single pass.

1. Read the puzzle in puzzle.md and the input in input.md
2. Write a Python solution to solution.py
3. Check it against the worked examples in the puzzle
4. Run it on the real input
5. Write only the final answer value to answer.txt

Write the minimum code needed. Match the answer format the puzzle asks for exactly.
\"Success\" below means answer.txt holds a verified answer; \"Failure\" means it does not.
",
    );
    if part == Part::Two {
        prompt.push_str(PART_TWO_CONTEXT);
    }
    if retry {
        prompt.push_str(
            "
<FEEDBACK>
Your previous answer was rejected. submission_issues.md explains why. Look for
off-by-one mistakes, misread rules, format problems and cases that only appear in the
full input. Your previous code is in solution.py.
</FEEDBACK>
",
        );
    }
    prompt.push_str(VERDICT_FOOTER);
    prompt
}
